//! Schema initialization against in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    fieldops_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info_str = format!("{:?}", info.expect("INFO FOR DB should return a value"));

    for table in [
        "tenant",
        "agent",
        "product",
        "inspection",
        "sequence",
        "registration_request",
        "export",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    fieldops_db::run_migrations(&db).await.unwrap();
    fieldops_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn manager_connects_to_embedded_engine() {
    let manager = fieldops_db::DbManager::connect(&fieldops_db::DbConfig::default())
        .await
        .unwrap();
    let mut result = manager
        .client()
        .query("SELECT count() AS total FROM tenant GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert!(rows.is_empty());
}
