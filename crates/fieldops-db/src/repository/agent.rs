//! SurrealDB implementation of [`AgentRepository`].

use chrono::{DateTime, Utc};
use fieldops_core::error::FieldOpsResult;
use fieldops_core::models::agent::{Agent, CreateAgent, ProductAssignment, UpdateAgent};
use fieldops_core::repository::{AgentQuery, AgentRepository, PaginatedResult};
use fieldops_core::scope::{Predicate, ResourceKind};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json, parse_uuid, scope_filter, search_needle, to_json};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('agent', $id)";

#[derive(Debug, SurrealValue)]
struct AgentRow {
    record_id: String,
    tenant_id: String,
    name: String,
    phone: String,
    password_hash: String,
    is_active: bool,
    total_inspections: i64,
    total_sales: f64,
    assigned_products: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentRow {
    fn try_into_agent(self) -> Result<Agent, DbError> {
        Ok(Agent {
            id: parse_uuid("agent", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            phone: self.phone,
            password_hash: self.password_hash,
            is_active: self.is_active,
            total_inspections: self.total_inspections,
            total_sales: self.total_sales,
            assigned_products: from_json("assigned_products", self.assigned_products)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn single(rows: Vec<AgentRow>, id: impl ToString) -> Result<Agent, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: id.to_string(),
        })?
        .try_into_agent()
}

/// SurrealDB implementation of the Agent repository.
#[derive(Clone)]
pub struct SurrealAgentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAgentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> Result<Agent, DbError> {
        let mut result = self.db.query(SELECT_ONE).bind(("id", id.to_string())).await?;
        let rows: Vec<AgentRow> = result.take(0)?;
        single(rows, id)
    }
}

impl<C: Connection> AgentRepository for SurrealAgentRepository<C> {
    async fn create(&self, input: CreateAgent) -> FieldOpsResult<Agent> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('agent', $id) SET \
                 tenant_id = $tenant_id, name = $name, phone = $phone, \
                 password_hash = $password_hash, is_active = true, \
                 total_inspections = 0, total_sales = 0.0, \
                 assigned_products = []; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("phone", input.phone))
            .bind(("password_hash", input.password_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("agent phone", e))?;
        let rows: Vec<AgentRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_id(&self, scope: &Predicate, id: Uuid) -> FieldOpsResult<Agent> {
        scope.ensure_allowed(ResourceKind::Agent)?;
        let agent = self.fetch(id).await?;
        scope.check_visible(ResourceKind::Agent, id, agent.tenant_id, Some(agent.id))?;
        Ok(agent)
    }

    async fn get_by_phone(&self, tenant_id: Uuid, phone: &str) -> FieldOpsResult<Agent> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agent \
                 WHERE tenant_id = $tenant_id AND phone = $phone",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("phone", phone.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, format!("phone={phone}"))?)
    }

    async fn update(&self, scope: &Predicate, id: Uuid, input: UpdateAgent) -> FieldOpsResult<Agent> {
        self.get_by_id(scope, id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('agent', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("agent phone", e))?;
        let rows: Vec<AgentRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn list(
        &self,
        scope: &Predicate,
        query: AgentQuery,
    ) -> FieldOpsResult<PaginatedResult<Agent>> {
        let scoped = scope_filter(scope, true)?;
        let mut conds = vec![scoped.clause];
        let needle = search_needle(query.search.as_deref());
        if needle.is_some() {
            conds.push("(string::lowercase(name) CONTAINS $needle OR phone CONTAINS $needle)");
        }
        if query.is_active.is_some() {
            conds.push("is_active = $is_active");
        }
        let filter = conds.join(" AND ");
        let page = query.pagination;

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM agent WHERE {filter} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM agent WHERE {filter} \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .bind(("needle", needle.unwrap_or_default()))
            .bind(("is_active", query.is_active.unwrap_or(true)))
            .bind(("limit", page.limit))
            .bind(("offset", page.offset))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<AgentRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AgentRow::try_into_agent)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: counts.first().map(|r| r.total).unwrap_or(0),
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn push_assignment(
        &self,
        scope: &Predicate,
        id: Uuid,
        assignment: ProductAssignment,
    ) -> FieldOpsResult<Agent> {
        self.get_by_id(scope, id).await?;

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('agent', $id) SET \
                 assigned_products += $assignment, updated_at = time::now(); \
                 {SELECT_ONE};"
            ))
            .bind(("id", id.to_string()))
            .bind(("assignment", to_json(&assignment)?))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AgentRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn record_activity(&self, id: Uuid, inspections: i64, sales: f64) -> FieldOpsResult<()> {
        self.db
            .query(
                "UPDATE type::record('agent', $id) SET \
                 total_inspections = math::max([total_inspections + $inspections, 0]), \
                 total_sales = math::max([total_sales + $sales, 0.0]), \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("inspections", inspections))
            .bind(("sales", sales))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn count(&self, scope: &Predicate, active_only: bool) -> FieldOpsResult<u64> {
        let scoped = scope_filter(scope, true)?;
        let active = if active_only { " AND is_active = true" } else { "" };

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM agent WHERE {}{active} GROUP ALL",
                scoped.clause
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
