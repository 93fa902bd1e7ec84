//! Scoped inspection export with time-boxed downloads.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult};
use crate::export::{self, OwnerNames};
use crate::models::claims::Claims;
use crate::models::export::{CreateExport, ExportEntry};
use crate::models::inspection::Inspection;
use crate::repository::{
    AgentRepository, ExportRepository, InspectionQuery, InspectionRepository, PaginatedResult,
    Pagination, TenantRepository,
};
use crate::scope::{self, Capability, Predicate, ResourceKind};

/// Upper bound on rows in a single export.
pub const MAX_EXPORT_ROWS: usize = 10_000;

/// Rendered CSV ready to send.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub csv: String,
    pub record_count: u64,
}

/// Outcome of fetching a stored export.
#[derive(Debug)]
pub enum Download {
    Ready(ExportEntry),
    Expired,
}

pub struct ExportService<I, A, T, E>
where
    I: InspectionRepository,
    A: AgentRepository,
    T: TenantRepository,
    E: ExportRepository,
{
    inspections: I,
    agents: A,
    tenants: T,
    exports: E,
    ttl: Duration,
}

impl<I, A, T, E> ExportService<I, A, T, E>
where
    I: InspectionRepository,
    A: AgentRepository,
    T: TenantRepository,
    E: ExportRepository,
{
    pub fn new(inspections: I, agents: A, tenants: T, exports: E, ttl: Duration) -> Self {
        Self {
            inspections,
            agents,
            tenants,
            exports,
            ttl,
        }
    }

    /// Render every inspection visible to the caller that matches `filter`.
    pub async fn render(
        &self,
        claims: &Claims,
        filter: InspectionQuery,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<CsvExport> {
        scope::require(claims, Capability::ExportInspections)?;
        let pred = scope::scope_for(claims, ResourceKind::Inspection);
        pred.ensure_allowed(ResourceKind::Inspection)?;

        let rows = self.collect(&pred, filter).await?;
        let names = self.owner_names(&rows).await;
        let csv = export::render(&rows, &names, now)?;

        Ok(CsvExport {
            file_name: export::file_name(now),
            csv,
            record_count: rows.len() as u64,
        })
    }

    /// Render and keep the result for a later one-shot download.
    pub async fn stage(
        &self,
        claims: &Claims,
        filter: InspectionQuery,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<ExportEntry> {
        let rendered = self.render(claims, filter, now).await?;
        let entry = self
            .exports
            .create(CreateExport {
                owner: claims.subject_id.clone(),
                file_name: rendered.file_name,
                csv: rendered.csv,
                record_count: rendered.record_count,
                expires_at: now + self.ttl,
            })
            .await?;
        info!(export_id = %entry.id, records = entry.record_count, "export staged");
        Ok(entry)
    }

    /// Serve a staged export once. The entry is removed whether it was
    /// served or found expired.
    pub async fn take(&self, id: Uuid, now: DateTime<Utc>) -> FieldOpsResult<Download> {
        let entry = self.exports.get(id).await?;
        if let Err(err) = self.exports.delete(id).await {
            warn!(export_id = %id, error = %err, "failed to remove served export");
        }
        if entry.is_expired(now) {
            return Ok(Download::Expired);
        }
        Ok(Download::Ready(entry))
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> FieldOpsResult<u64> {
        let removed = self.exports.purge_expired(now).await?;
        if removed > 0 {
            info!(removed, "expired exports purged");
        }
        Ok(removed)
    }

    async fn collect(
        &self,
        pred: &Predicate,
        filter: InspectionQuery,
    ) -> FieldOpsResult<Vec<Inspection>> {
        collect_pages(MAX_EXPORT_ROWS, |offset| {
            self.inspections.list(
                pred,
                InspectionQuery {
                    pagination: Pagination {
                        offset,
                        limit: Pagination::MAX_LIMIT,
                    },
                    ..filter.clone()
                },
            )
        })
        .await
    }

    async fn owner_names(&self, rows: &[Inspection]) -> OwnerNames {
        let mut names = OwnerNames::default();
        for row in rows {
            if !names.tenants.contains_key(&row.tenant_id)
                && let Ok(t) = self.tenants.get_by_id(row.tenant_id).await
            {
                names.tenants.insert(row.tenant_id, t.agency_name);
            }
            if !names.agents.contains_key(&row.agent_id)
                && let Ok(a) = self.agents.get_by_id(&Predicate::All, row.agent_id).await
            {
                names.agents.insert(row.agent_id, a.name);
            }
        }
        names
    }
}

/// Drain a paged listing, failing as soon as more than `cap` rows arrive.
pub(crate) async fn collect_pages<T, F, Fut>(cap: usize, mut fetch: F) -> FieldOpsResult<Vec<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = FieldOpsResult<PaginatedResult<T>>>,
{
    let mut rows = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch(offset).await?;
        let fetched = page.items.len() as u64;
        rows.extend(page.items);
        offset += fetched;
        if rows.len() > cap {
            return Err(FieldOpsError::validation(format!(
                "result exceeds {cap} rows; narrow the filter"
            )));
        }
        if fetched == 0 || offset >= page.total {
            return Ok(rows);
        }
    }
}
