//! SurrealDB repository implementations.
//!
//! Scoped list queries translate a [`Predicate`] into a WHERE fragment
//! over `$scope_tenant` / `$scope_agent`; both parameters are always
//! bound so callers never branch on the predicate shape. Single-record
//! lookups fetch by key and then check visibility in Rust.

mod agent;
mod export;
mod inspection;
mod product;
mod registration;
mod tenant;

pub use agent::SurrealAgentRepository;
pub use export::SurrealExportRepository;
pub use inspection::SurrealInspectionRepository;
pub use product::SurrealProductRepository;
pub use registration::SurrealRegistrationRepository;
pub use tenant::SurrealTenantRepository;

use fieldops_core::error::{FieldOpsError, FieldOpsResult};
use fieldops_core::scope::Predicate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|e| DbError::Decode(e.to_string()))
}

pub(crate) fn from_json<T: DeserializeOwned>(
    field: &str,
    value: serde_json::Value,
) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::Decode(format!("{field}: {e}")))
}

/// WHERE fragment plus the values for `$scope_tenant` and `$scope_agent`.
pub(crate) struct ScopeFilter {
    pub clause: &'static str,
    pub tenant: String,
    pub agent: String,
}

/// Translate a predicate into a filter. With `agent_is_record` the agent
/// predicate matches the record key itself rather than an `agent_id`
/// column. `Denied` never reaches the store.
pub(crate) fn scope_filter(
    scope: &Predicate,
    agent_is_record: bool,
) -> FieldOpsResult<ScopeFilter> {
    let (clause, tenant, agent) = match *scope {
        Predicate::All => ("true", String::new(), String::new()),
        Predicate::Tenant(t) => ("tenant_id = $scope_tenant", t.to_string(), String::new()),
        Predicate::Agent {
            tenant_id,
            agent_id,
        } => (
            if agent_is_record {
                "tenant_id = $scope_tenant AND meta::id(id) = $scope_agent"
            } else {
                "tenant_id = $scope_tenant AND agent_id = $scope_agent"
            },
            tenant_id.to_string(),
            agent_id.to_string(),
        ),
        Predicate::Denied => {
            return Err(FieldOpsError::denied("role may not access this resource"));
        }
    };
    Ok(ScopeFilter {
        clause,
        tenant,
        agent,
    })
}

/// Case-insensitive substring needle, `None` for blank searches.
pub(crate) fn search_needle(search: Option<&str>) -> Option<String> {
    search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}
