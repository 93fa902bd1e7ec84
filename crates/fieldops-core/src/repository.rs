//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Reads and writes against
//! tenant-owned records take the [`Predicate`] resolved from the caller's
//! claims; a record outside the predicate behaves exactly as a missing
//! one. Methods without a predicate are system-level and must only be
//! reached after the caller has been authorized.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::FieldOpsResult;
use crate::models::{
    agent::{Agent, CreateAgent, ProductAssignment, UpdateAgent},
    export::{CreateExport, ExportEntry},
    inspection::{CreateInspection, Inspection, InspectionContent, InspectionStatus},
    product::{CreateProduct, DuplicateField, Product, UpdateProduct},
    registration::{CreateRegistration, RegistrationRequest, RegistrationStatus, ReviewDecision},
    tenant::{CreateTenant, Tenant, UpdateTenant},
};
use crate::scope::Predicate;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    pub const MAX_LIMIT: u64 = 100;

    /// Build from 1-based page numbering as used on the wire.
    pub fn page(page: Option<u64>, limit: Option<u64>) -> Self {
        let limit = limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT);
        let page = page.unwrap_or(1).max(1);
        Self {
            offset: (page - 1) * limit,
            limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TenantQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct AgentQuery {
    /// Matches name or phone, case-insensitively.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Matches name, model or serial number, case-insensitively.
    pub search: Option<String>,
    pub product_type: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct InspectionQuery {
    pub agent_id: Option<Uuid>,
    pub status: Option<InspectionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Matches consumer name, consumer number or mobile number.
    pub search: Option<String>,
    pub pagination: Pagination,
}

/// Aggregate over the inspections visible to a predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionSummary {
    pub total: u64,
    pub completed: u64,
    pub issues_found: u64,
    pub total_sales: f64,
}

/// One inspection reduced to what the chart series read.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPoint {
    pub agent_id: Uuid,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tenant (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = FieldOpsResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FieldOpsResult<Tenant>> + Send;
    /// Lookup by business code, active or not.
    fn get_by_code(&self, code: &str) -> impl Future<Output = FieldOpsResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = FieldOpsResult<Tenant>> + Send;
    /// Add signed deltas to the denormalized counters.
    fn adjust_counters(
        &self,
        id: Uuid,
        agents: i64,
        inspections: i64,
    ) -> impl Future<Output = FieldOpsResult<()>> + Send;
    fn list(
        &self,
        query: TenantQuery,
    ) -> impl Future<Output = FieldOpsResult<PaginatedResult<Tenant>>> + Send;
    fn count_active(&self) -> impl Future<Output = FieldOpsResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait AgentRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the phone is taken in the tenant.
    fn create(&self, input: CreateAgent) -> impl Future<Output = FieldOpsResult<Agent>> + Send;
    fn get_by_id(
        &self,
        scope: &Predicate,
        id: Uuid,
    ) -> impl Future<Output = FieldOpsResult<Agent>> + Send;
    fn get_by_phone(
        &self,
        tenant_id: Uuid,
        phone: &str,
    ) -> impl Future<Output = FieldOpsResult<Agent>> + Send;
    fn update(
        &self,
        scope: &Predicate,
        id: Uuid,
        input: UpdateAgent,
    ) -> impl Future<Output = FieldOpsResult<Agent>> + Send;
    fn list(
        &self,
        scope: &Predicate,
        query: AgentQuery,
    ) -> impl Future<Output = FieldOpsResult<PaginatedResult<Agent>>> + Send;
    fn push_assignment(
        &self,
        scope: &Predicate,
        id: Uuid,
        assignment: ProductAssignment,
    ) -> impl Future<Output = FieldOpsResult<Agent>> + Send;
    /// Add signed deltas to the agent's running totals.
    fn record_activity(
        &self,
        id: Uuid,
        inspections: i64,
        sales: f64,
    ) -> impl Future<Output = FieldOpsResult<()>> + Send;
    fn count(
        &self,
        scope: &Predicate,
        active_only: bool,
    ) -> impl Future<Output = FieldOpsResult<u64>> + Send;
}

pub trait ProductRepository: Send + Sync {
    fn create(&self, input: CreateProduct)
    -> impl Future<Output = FieldOpsResult<Product>> + Send;
    fn get_by_id(
        &self,
        scope: &Predicate,
        id: Uuid,
    ) -> impl Future<Output = FieldOpsResult<Product>> + Send;
    fn update(
        &self,
        scope: &Predicate,
        id: Uuid,
        input: UpdateProduct,
    ) -> impl Future<Output = FieldOpsResult<Product>> + Send;
    fn delete(&self, scope: &Predicate, id: Uuid)
    -> impl Future<Output = FieldOpsResult<()>> + Send;
    fn list(
        &self,
        scope: &Predicate,
        query: ProductQuery,
    ) -> impl Future<Output = FieldOpsResult<PaginatedResult<Product>>> + Send;
    /// Report which unique key (if any) another product in the tenant
    /// already holds. Names compare case-insensitively.
    fn find_duplicate(
        &self,
        tenant_id: Uuid,
        name: &str,
        serial_number: Option<&str>,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = FieldOpsResult<Option<DuplicateField>>> + Send;
    /// Atomically decrement stock by `quantity`, failing with
    /// `InsufficientStock` and no mutation when stock is short.
    fn reserve_stock(
        &self,
        scope: &Predicate,
        id: Uuid,
        quantity: i64,
    ) -> impl Future<Output = FieldOpsResult<Product>> + Send;
    /// Return previously reserved stock.
    fn release_stock(
        &self,
        id: Uuid,
        quantity: i64,
    ) -> impl Future<Output = FieldOpsResult<()>> + Send;
    fn count(&self, scope: &Predicate) -> impl Future<Output = FieldOpsResult<u64>> + Send;
}

pub trait InspectionRepository: Send + Sync {
    /// Persist and assign the next display id from the global sequence.
    fn create(
        &self,
        input: CreateInspection,
    ) -> impl Future<Output = FieldOpsResult<Inspection>> + Send;
    fn get_by_id(
        &self,
        scope: &Predicate,
        id: Uuid,
    ) -> impl Future<Output = FieldOpsResult<Inspection>> + Send;
    fn update(
        &self,
        scope: &Predicate,
        id: Uuid,
        content: InspectionContent,
    ) -> impl Future<Output = FieldOpsResult<Inspection>> + Send;
    /// Returns the removed record.
    fn delete(
        &self,
        scope: &Predicate,
        id: Uuid,
    ) -> impl Future<Output = FieldOpsResult<Inspection>> + Send;
    /// Newest first.
    fn list(
        &self,
        scope: &Predicate,
        query: InspectionQuery,
    ) -> impl Future<Output = FieldOpsResult<PaginatedResult<Inspection>>> + Send;
    fn summary(
        &self,
        scope: &Predicate,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = FieldOpsResult<InspectionSummary>> + Send;
    /// Inspections created at or after `since`, oldest first.
    fn activity(
        &self,
        scope: &Predicate,
        since: DateTime<Utc>,
    ) -> impl Future<Output = FieldOpsResult<Vec<ActivityPoint>>> + Send;
}

// ---------------------------------------------------------------------------
// Platform-level repositories
// ---------------------------------------------------------------------------

pub trait RegistrationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRegistration,
    ) -> impl Future<Output = FieldOpsResult<RegistrationRequest>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = FieldOpsResult<RegistrationRequest>> + Send;
    fn find_pending_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = FieldOpsResult<Option<RegistrationRequest>>> + Send;
    fn list(
        &self,
        status: Option<RegistrationStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = FieldOpsResult<PaginatedResult<RegistrationRequest>>> + Send;
    /// Write a terminal decision only if the request is still pending.
    /// Returns `None` when it was already processed.
    fn complete(
        &self,
        id: Uuid,
        decision: ReviewDecision,
    ) -> impl Future<Output = FieldOpsResult<Option<RegistrationRequest>>> + Send;
    fn count_pending(&self) -> impl Future<Output = FieldOpsResult<u64>> + Send;
}

pub trait ExportRepository: Send + Sync {
    fn create(&self, input: CreateExport)
    -> impl Future<Output = FieldOpsResult<ExportEntry>> + Send;
    fn get(&self, id: Uuid) -> impl Future<Output = FieldOpsResult<ExportEntry>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = FieldOpsResult<()>> + Send;
    /// Remove every entry whose expiry is at or before `now`.
    fn purge_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = FieldOpsResult<u64>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_map_to_offsets() {
        let p = Pagination::page(Some(3), Some(20));
        assert_eq!((p.offset, p.limit), (40, 20));

        let p = Pagination::page(Some(0), Some(1000));
        assert_eq!((p.offset, p.limit), (0, Pagination::MAX_LIMIT));

        let p = Pagination::page(None, None);
        assert_eq!((p.offset, p.limit), (0, 10));
    }
}
