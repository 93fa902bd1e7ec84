//! Shared fixtures for repository integration tests.

#![allow(dead_code)]

use fieldops_core::models::agent::{Agent, CreateAgent};
use fieldops_core::models::tenant::{AppSettings, CreateTenant, Tenant};
use fieldops_core::repository::{AgentRepository, TenantRepository};
use fieldops_db::repository::{SurrealAgentRepository, SurrealTenantRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Spin up an in-memory DB and run migrations.
pub async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fieldops_db::run_migrations(&db).await.unwrap();
    db
}

pub async fn tenant(db: &Surreal<Db>, code: &str) -> Tenant {
    SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            code: code.into(),
            agency_name: format!("{code} Gas Agency"),
            admin_name: "Admin".into(),
            admin_phone: "9000000000".into(),
            admin_password_hash: "$argon2id$placeholder".into(),
            app_settings: AppSettings::default(),
        })
        .await
        .unwrap()
}

pub async fn agent(db: &Surreal<Db>, tenant: &Tenant, phone: &str) -> Agent {
    SurrealAgentRepository::new(db.clone())
        .create(CreateAgent {
            tenant_id: tenant.id,
            name: format!("Agent {phone}"),
            phone: phone.into(),
            password_hash: "$argon2id$placeholder".into(),
        })
        .await
        .unwrap()
}
