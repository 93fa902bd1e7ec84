//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use fieldops_core::error::FieldOpsResult;
use fieldops_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use fieldops_core::repository::{PaginatedResult, TenantQuery, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json, parse_uuid, search_needle, to_json};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('tenant', $id)";

#[derive(Debug, SurrealValue)]
struct TenantRow {
    record_id: String,
    code: String,
    agency_name: String,
    admin_name: String,
    admin_phone: String,
    admin_password_hash: String,
    is_active: bool,
    app_settings: serde_json::Value,
    agent_count: i64,
    inspection_count: i64,
    approved_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id: parse_uuid("tenant", &self.record_id)?,
            code: self.code,
            agency_name: self.agency_name,
            admin_name: self.admin_name,
            admin_phone: self.admin_phone,
            admin_password_hash: self.admin_password_hash,
            is_active: self.is_active,
            app_settings: from_json("app_settings", self.app_settings)?,
            agent_count: self.agent_count,
            inspection_count: self.inspection_count,
            approved_at: self.approved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn single(rows: Vec<TenantRow>, id: impl ToString) -> Result<Tenant, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id.to_string(),
        })?
        .try_into_tenant()
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> FieldOpsResult<Tenant> {
        let id = Uuid::new_v4();
        let settings = to_json(&input.app_settings)?;

        let result = self
            .db
            .query(format!(
                "CREATE type::record('tenant', $id) SET \
                 code = $code, agency_name = $agency_name, \
                 admin_name = $admin_name, admin_phone = $admin_phone, \
                 admin_password_hash = $admin_password_hash, \
                 is_active = true, app_settings = $app_settings, \
                 agent_count = 0, inspection_count = 0; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("agency_name", input.agency_name))
            .bind(("admin_name", input.admin_name))
            .bind(("admin_phone", input.admin_phone))
            .bind(("admin_password_hash", input.admin_password_hash))
            .bind(("app_settings", settings))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("tenant code", e))?;
        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FieldOpsResult<Tenant> {
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_code(&self, code: &str) -> FieldOpsResult<Tenant> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM tenant WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, format!("code={code}"))?)
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> FieldOpsResult<Tenant> {
        let mut sets = Vec::new();
        if input.agency_name.is_some() {
            sets.push("agency_name = $agency_name");
        }
        if input.admin_name.is_some() {
            sets.push("admin_name = $admin_name");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.app_settings.is_some() {
            sets.push("app_settings = $app_settings");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(agency_name) = input.agency_name {
            builder = builder.bind(("agency_name", agency_name));
        }
        if let Some(admin_name) = input.admin_name {
            builder = builder.bind(("admin_name", admin_name));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(settings) = input.app_settings {
            builder = builder.bind(("app_settings", to_json(&settings)?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn adjust_counters(&self, id: Uuid, agents: i64, inspections: i64) -> FieldOpsResult<()> {
        self.db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 agent_count = math::max([agent_count + $agents, 0]), \
                 inspection_count = math::max([inspection_count + $inspections, 0]), \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("agents", agents))
            .bind(("inspections", inspections))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, query: TenantQuery) -> FieldOpsResult<PaginatedResult<Tenant>> {
        let mut conds = vec!["true"];
        let needle = search_needle(query.search.as_deref());
        if needle.is_some() {
            conds.push(
                "(string::lowercase(agency_name) CONTAINS $needle \
                 OR string::lowercase(code) CONTAINS $needle \
                 OR string::lowercase(admin_name) CONTAINS $needle)",
            );
        }
        if query.is_active.is_some() {
            conds.push("is_active = $is_active");
        }
        let filter = conds.join(" AND ");
        let page = query.pagination;

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM tenant WHERE {filter} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM tenant WHERE {filter} \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("needle", needle.unwrap_or_default()))
            .bind(("is_active", query.is_active.unwrap_or(true)))
            .bind(("limit", page.limit))
            .bind(("offset", page.offset))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(TenantRow::try_into_tenant)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: counts.first().map(|r| r.total).unwrap_or(0),
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn count_active(&self) -> FieldOpsResult<u64> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM tenant WHERE is_active = true GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
