//! SurrealDB implementation of [`RegistrationRepository`].

use chrono::{DateTime, Utc};
use fieldops_core::error::FieldOpsResult;
use fieldops_core::models::registration::{
    CreateRegistration, RegistrationRequest, RegistrationStatus, ReviewDecision, StagedAgent,
};
use fieldops_core::repository::{PaginatedResult, Pagination, RegistrationRepository};
use serde::{Deserialize, Serialize};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json, parse_uuid, to_json};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('registration_request', $id)";

/// Stored form of a staged agent. Unlike the domain type it keeps the
/// password hash, which approval copies onto the new agent.
#[derive(Serialize, Deserialize)]
struct StagedAgentDoc {
    name: String,
    phone: String,
    password_hash: String,
}

impl From<StagedAgent> for StagedAgentDoc {
    fn from(a: StagedAgent) -> Self {
        Self {
            name: a.name,
            phone: a.phone,
            password_hash: a.password_hash,
        }
    }
}

impl From<StagedAgentDoc> for StagedAgent {
    fn from(d: StagedAgentDoc) -> Self {
        Self {
            name: d.name,
            phone: d.phone,
            password_hash: d.password_hash,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct RegistrationRow {
    record_id: String,
    code: String,
    agency_name: String,
    admin_name: String,
    admin_phone: String,
    admin_password_hash: String,
    agents: serde_json::Value,
    status: String,
    requested_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    rejection_reason: Option<String>,
    tenant_id: Option<String>,
    failed_agents: serde_json::Value,
}

impl RegistrationRow {
    fn try_into_request(self) -> Result<RegistrationRequest, DbError> {
        let status = RegistrationStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown request status: {}", self.status)))?;
        let agents: Vec<StagedAgentDoc> = from_json("agents", self.agents)?;
        Ok(RegistrationRequest {
            id: parse_uuid("registration_request", &self.record_id)?,
            code: self.code,
            agency_name: self.agency_name,
            admin_name: self.admin_name,
            admin_phone: self.admin_phone,
            admin_password_hash: self.admin_password_hash,
            agents: agents.into_iter().map(StagedAgent::from).collect(),
            status,
            requested_at: self.requested_at,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            rejection_reason: self.rejection_reason,
            tenant_id: self
                .tenant_id
                .as_deref()
                .map(|t| parse_uuid("tenant", t))
                .transpose()?,
            failed_agents: from_json("failed_agents", self.failed_agents)?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct StatusRow {
    #[allow(dead_code)]
    status: String,
}

fn single(rows: Vec<RegistrationRow>, id: impl ToString) -> Result<RegistrationRequest, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "registration_request".into(),
            id: id.to_string(),
        })?
        .try_into_request()
}

/// SurrealDB implementation of the registration request repository.
#[derive(Clone)]
pub struct SurrealRegistrationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRegistrationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn insert(&self, id: Uuid, input: CreateRegistration) -> Result<RegistrationRequest, DbError> {
        let agents: Vec<StagedAgentDoc> = input.agents.into_iter().map(Into::into).collect();

        let mut result = self
            .db
            .query(format!(
                "CREATE type::record('registration_request', $id) SET \
                 code = $code, agency_name = $agency_name, \
                 admin_name = $admin_name, admin_phone = $admin_phone, \
                 admin_password_hash = $admin_password_hash, \
                 agents = $agents, status = 'pending', failed_agents = []; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("agency_name", input.agency_name))
            .bind(("admin_name", input.admin_name))
            .bind(("admin_phone", input.admin_phone))
            .bind(("admin_password_hash", input.admin_password_hash))
            .bind(("agents", to_json(&agents)?))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<RegistrationRow> = result.take(1)?;
        single(rows, id)
    }

    /// Drop the code claim held by a request.
    async fn release(&self, id: Uuid) -> Result<(), DbError> {
        self.db
            .query("DELETE pending_code WHERE request = $id")
            .bind(("id", id.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}

impl<C: Connection> RegistrationRepository for SurrealRegistrationRepository<C> {
    async fn create(&self, input: CreateRegistration) -> FieldOpsResult<RegistrationRequest> {
        let id = Uuid::new_v4();

        // Claim the code first; a concurrent submission for it loses here.
        self.db
            .query("CREATE type::record('pending_code', $code) SET request = $id")
            .bind(("code", input.code.clone()))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("pending registration code", e))?;

        match self.insert(id, input).await {
            Ok(request) => Ok(request),
            Err(err) => {
                self.release(id).await?;
                Err(err.into())
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> FieldOpsResult<RegistrationRequest> {
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<RegistrationRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn find_pending_by_code(&self, code: &str) -> FieldOpsResult<Option<RegistrationRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM registration_request \
                 WHERE code = $code AND status = 'pending' LIMIT 1",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<RegistrationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(RegistrationRow::try_into_request)
            .transpose()?)
    }

    async fn list(
        &self,
        status: Option<RegistrationStatus>,
        pagination: Pagination,
    ) -> FieldOpsResult<PaginatedResult<RegistrationRequest>> {
        let filter = if status.is_some() { "status = $status" } else { "true" };

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM registration_request \
                 WHERE {filter} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM registration_request \
                 WHERE {filter} ORDER BY requested_at DESC \
                 LIMIT $limit START $offset;"
            ))
            .bind(("status", status.map(|s| s.as_str()).unwrap_or_default().to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<RegistrationRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(RegistrationRow::try_into_request)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: counts.first().map(|r| r.total).unwrap_or(0),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn complete(
        &self,
        id: Uuid,
        decision: ReviewDecision,
    ) -> FieldOpsResult<Option<RegistrationRequest>> {
        // The pending guard makes the terminal transition happen once.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('registration_request', $id) SET \
                 status = $status, reviewed_at = time::now(), \
                 reviewed_by = $reviewed_by, \
                 rejection_reason = $rejection_reason, \
                 tenant_id = $tenant_id, failed_agents = $failed_agents \
                 WHERE status = 'pending' RETURN status",
            )
            .bind(("id", id.to_string()))
            .bind(("status", decision.status.as_str().to_string()))
            .bind(("reviewed_by", decision.reviewed_by))
            .bind(("rejection_reason", decision.rejection_reason))
            .bind(("tenant_id", decision.tenant_id.map(|t| t.to_string())))
            .bind(("failed_agents", to_json(&decision.failed_agents)?))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<StatusRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Ok(None);
        }
        self.release(id).await?;
        self.get_by_id(id).await.map(Some)
    }

    async fn count_pending(&self) -> FieldOpsResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM registration_request \
                 WHERE status = 'pending' GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
