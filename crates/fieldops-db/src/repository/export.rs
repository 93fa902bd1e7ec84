//! SurrealDB implementation of [`ExportRepository`].

use chrono::{DateTime, Utc};
use fieldops_core::error::FieldOpsResult;
use fieldops_core::models::export::{CreateExport, ExportEntry};
use fieldops_core::repository::ExportRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('export', $id)";

#[derive(Debug, SurrealValue)]
struct ExportRow {
    record_id: String,
    owner: String,
    file_name: String,
    csv: String,
    record_count: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ExportRow {
    fn try_into_entry(self) -> Result<ExportEntry, DbError> {
        Ok(ExportEntry {
            id: parse_uuid("export", &self.record_id)?,
            owner: self.owner,
            file_name: self.file_name,
            csv: self.csv,
            record_count: self.record_count,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

fn single(rows: Vec<ExportRow>, id: Uuid) -> Result<ExportEntry, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "export".into(),
            id: id.to_string(),
        })?
        .try_into_entry()
}

/// SurrealDB implementation of the export staging repository.
#[derive(Clone)]
pub struct SurrealExportRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealExportRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ExportRepository for SurrealExportRepository<C> {
    async fn create(&self, input: CreateExport) -> FieldOpsResult<ExportEntry> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('export', $id) SET \
                 owner = $owner, file_name = $file_name, csv = $csv, \
                 record_count = $record_count, expires_at = $expires_at; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id.to_string()))
            .bind(("owner", input.owner))
            .bind(("file_name", input.file_name))
            .bind(("csv", input.csv))
            .bind(("record_count", input.record_count))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<ExportRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get(&self, id: Uuid) -> FieldOpsResult<ExportEntry> {
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ExportRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> FieldOpsResult<()> {
        self.db
            .query("DELETE type::record('export', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> FieldOpsResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM export \
                 WHERE expires_at <= $now GROUP ALL; \
                 DELETE export WHERE expires_at <= $now;",
            )
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let count = counts.first().map(|r| r.total).unwrap_or(0);
        if count > 0 {
            debug!(count, "expired exports purged");
        }
        Ok(count)
    }
}
