//! SurrealDB implementation of [`InspectionRepository`].
//!
//! Consumer and location snapshots are stored as flat columns so list
//! filters and exports can reach them; embedded lists (answers, line
//! items, images) are flexible objects decoded through serde.

use chrono::{DateTime, Utc};
use fieldops_core::error::FieldOpsResult;
use fieldops_core::inspection::display_id;
use fieldops_core::models::inspection::{
    Consumer, CreateInspection, Inspection, InspectionContent, InspectionStatus, Location,
};
use fieldops_core::repository::{
    ActivityPoint, InspectionQuery, InspectionRepository, InspectionSummary, PaginatedResult,
};
use fieldops_core::scope::{Predicate, ResourceKind};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json, parse_uuid, scope_filter, search_needle, to_json};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('inspection', $id)";

/// Assignments shared by CREATE and full-content UPDATE.
const CONTENT_SETS: &str = "consumer_name = $consumer_name, \
     consumer_number = $consumer_number, mobile_number = $mobile_number, \
     address = $address, safety_questions = $safety_questions, \
     products = $products, images = $images, \
     suraksha_hose_due_date = $suraksha_hose_due_date, \
     hotplate_exchange = $hotplate_exchange, other_discount = $other_discount, \
     subtotal_amount = $subtotal_amount, total_discount = $total_discount, \
     total_amount = $total_amount, latitude = $latitude, \
     longitude = $longitude, location_address = $location_address, \
     location_accuracy = $location_accuracy, status = $status, \
     passed_questions = $passed_questions, \
     failed_questions = $failed_questions, \
     inspection_date = $inspection_date";

#[derive(Debug, SurrealValue)]
struct InspectionRow {
    record_id: String,
    inspection_id: String,
    tenant_id: String,
    agent_id: String,
    consumer_name: String,
    consumer_number: String,
    mobile_number: String,
    address: String,
    safety_questions: serde_json::Value,
    products: serde_json::Value,
    images: serde_json::Value,
    suraksha_hose_due_date: Option<String>,
    hotplate_exchange: bool,
    other_discount: f64,
    subtotal_amount: f64,
    total_discount: f64,
    total_amount: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    location_address: Option<String>,
    location_accuracy: Option<f64>,
    status: String,
    passed_questions: u32,
    failed_questions: u32,
    inspection_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InspectionRow {
    fn try_into_inspection(self) -> Result<Inspection, DbError> {
        let status = InspectionStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown inspection status: {}", self.status)))?;
        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
                address: self.location_address,
                accuracy: self.location_accuracy,
            }),
            _ => None,
        };
        Ok(Inspection {
            id: parse_uuid("inspection", &self.record_id)?,
            inspection_id: self.inspection_id,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            agent_id: parse_uuid("agent", &self.agent_id)?,
            content: InspectionContent {
                consumer: Consumer {
                    name: self.consumer_name,
                    consumer_number: self.consumer_number,
                    mobile_number: self.mobile_number,
                    address: self.address,
                },
                safety_questions: from_json("safety_questions", self.safety_questions)?,
                suraksha_hose_due_date: self.suraksha_hose_due_date,
                images: from_json("images", self.images)?,
                products: from_json("products", self.products)?,
                hotplate_exchange: self.hotplate_exchange,
                other_discount: self.other_discount,
                subtotal_amount: self.subtotal_amount,
                total_discount: self.total_discount,
                total_amount: self.total_amount,
                location,
                status,
                passed_questions: self.passed_questions,
                failed_questions: self.failed_questions,
                inspection_date: self.inspection_date,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ActivityRow {
    agent_id: String,
    total_amount: f64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SequenceRow {
    value: u64,
}

#[derive(Debug, SurrealValue)]
struct SummaryRow {
    total: u64,
    completed: u64,
    issues_found: u64,
    total_sales: f64,
}

fn single(rows: Vec<InspectionRow>, id: impl ToString) -> Result<Inspection, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "inspection".into(),
            id: id.to_string(),
        })?
        .try_into_inspection()
}

/// SurrealDB implementation of the Inspection repository.
#[derive(Clone)]
pub struct SurrealInspectionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInspectionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> Result<Inspection, DbError> {
        let mut result = self.db.query(SELECT_ONE).bind(("id", id.to_string())).await?;
        let rows: Vec<InspectionRow> = result.take(0)?;
        single(rows, id)
    }

    /// Advance the global display-id counter and return the new value.
    async fn next_ordinal(&self) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query("UPSERT type::record('sequence', 'inspection') SET value += 1 RETURN value")
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<SequenceRow> = result.take(0)?;
        rows.first()
            .map(|r| r.value)
            .ok_or_else(|| DbError::Query("inspection sequence returned no value".into()))
    }

    async fn write(
        &self,
        statement: String,
        id: Uuid,
        extra: Vec<(&'static str, String)>,
        content: InspectionContent,
    ) -> Result<Inspection, DbError> {
        let location = content.location;
        let mut builder = self
            .db
            .query(statement)
            .bind(("id", id.to_string()))
            .bind(("consumer_name", content.consumer.name))
            .bind(("consumer_number", content.consumer.consumer_number))
            .bind(("mobile_number", content.consumer.mobile_number))
            .bind(("address", content.consumer.address))
            .bind(("safety_questions", to_json(&content.safety_questions)?))
            .bind(("products", to_json(&content.products)?))
            .bind(("images", to_json(&content.images)?))
            .bind(("suraksha_hose_due_date", content.suraksha_hose_due_date))
            .bind(("hotplate_exchange", content.hotplate_exchange))
            .bind(("other_discount", content.other_discount))
            .bind(("subtotal_amount", content.subtotal_amount))
            .bind(("total_discount", content.total_discount))
            .bind(("total_amount", content.total_amount))
            .bind(("latitude", location.as_ref().map(|l| l.latitude)))
            .bind(("longitude", location.as_ref().map(|l| l.longitude)))
            .bind((
                "location_address",
                location.as_ref().and_then(|l| l.address.clone()),
            ))
            .bind(("location_accuracy", location.as_ref().and_then(|l| l.accuracy)))
            .bind(("status", content.status.as_str().to_string()))
            .bind(("passed_questions", content.passed_questions))
            .bind(("failed_questions", content.failed_questions))
            .bind(("inspection_date", content.inspection_date));
        for (key, value) in extra {
            builder = builder.bind((key, value));
        }

        let mut result = builder
            .await?
            .check()
            .map_err(|e| DbError::from_statement("inspection id", e))?;
        let rows: Vec<InspectionRow> = result.take(1)?;
        single(rows, id)
    }
}

impl<C: Connection> InspectionRepository for SurrealInspectionRepository<C> {
    async fn create(&self, input: CreateInspection) -> FieldOpsResult<Inspection> {
        let id = Uuid::new_v4();
        let ordinal = self.next_ordinal().await?;
        let display = display_id(Utc::now(), ordinal);

        let statement = format!(
            "CREATE type::record('inspection', $id) SET \
             inspection_id = $inspection_id, tenant_id = $tenant_id, \
             agent_id = $agent_id, {CONTENT_SETS}; {SELECT_ONE};"
        );
        let extra = vec![
            ("inspection_id", display),
            ("tenant_id", input.tenant_id.to_string()),
            ("agent_id", input.agent_id.to_string()),
        ];
        Ok(self.write(statement, id, extra, input.content).await?)
    }

    async fn get_by_id(&self, scope: &Predicate, id: Uuid) -> FieldOpsResult<Inspection> {
        scope.ensure_allowed(ResourceKind::Inspection)?;
        let inspection = self.fetch(id).await?;
        scope.check_visible(
            ResourceKind::Inspection,
            id,
            inspection.tenant_id,
            Some(inspection.agent_id),
        )?;
        Ok(inspection)
    }

    async fn update(
        &self,
        scope: &Predicate,
        id: Uuid,
        content: InspectionContent,
    ) -> FieldOpsResult<Inspection> {
        self.get_by_id(scope, id).await?;

        let statement = format!(
            "UPDATE type::record('inspection', $id) SET {CONTENT_SETS}, \
             updated_at = time::now(); {SELECT_ONE};"
        );
        Ok(self.write(statement, id, Vec::new(), content).await?)
    }

    async fn delete(&self, scope: &Predicate, id: Uuid) -> FieldOpsResult<Inspection> {
        let inspection = self.get_by_id(scope, id).await?;
        self.db
            .query("DELETE type::record('inspection', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(inspection)
    }

    async fn list(
        &self,
        scope: &Predicate,
        query: InspectionQuery,
    ) -> FieldOpsResult<PaginatedResult<Inspection>> {
        let scoped = scope_filter(scope, false)?;
        let mut conds = vec![scoped.clause];
        if query.agent_id.is_some() {
            conds.push("agent_id = $agent_id");
        }
        if query.status.is_some() {
            conds.push("status = $status");
        }
        if query.from.is_some() {
            conds.push("created_at >= $from");
        }
        if query.to.is_some() {
            conds.push("created_at <= $to");
        }
        let needle = search_needle(query.search.as_deref());
        if needle.is_some() {
            conds.push(
                "(string::lowercase(consumer_name) CONTAINS $needle \
                 OR string::lowercase(consumer_number) CONTAINS $needle \
                 OR mobile_number CONTAINS $needle)",
            );
        }
        let filter = conds.join(" AND ");
        let page = query.pagination;
        let epoch = DateTime::<Utc>::UNIX_EPOCH;

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM inspection WHERE {filter} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM inspection WHERE {filter} \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .bind((
                "agent_id",
                query.agent_id.map(|a| a.to_string()).unwrap_or_default(),
            ))
            .bind((
                "status",
                query.status.map(|s| s.as_str()).unwrap_or_default().to_string(),
            ))
            .bind(("from", query.from.unwrap_or(epoch)))
            .bind(("to", query.to.unwrap_or(epoch)))
            .bind(("needle", needle.unwrap_or_default()))
            .bind(("limit", page.limit))
            .bind(("offset", page.offset))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<InspectionRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(InspectionRow::try_into_inspection)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: counts.first().map(|r| r.total).unwrap_or(0),
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn summary(
        &self,
        scope: &Predicate,
        since: Option<DateTime<Utc>>,
    ) -> FieldOpsResult<InspectionSummary> {
        let scoped = scope_filter(scope, false)?;
        let window = if since.is_some() { " AND created_at >= $since" } else { "" };

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total, \
                 count(status = 'completed') AS completed, \
                 count(status = 'issues_found') AS issues_found, \
                 math::sum(total_amount) AS total_sales \
                 FROM inspection WHERE {}{window} GROUP ALL",
                scoped.clause
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .bind(("since", since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SummaryRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| InspectionSummary {
                total: r.total,
                completed: r.completed,
                issues_found: r.issues_found,
                total_sales: r.total_sales,
            })
            .unwrap_or_default())
    }

    async fn activity(
        &self,
        scope: &Predicate,
        since: DateTime<Utc>,
    ) -> FieldOpsResult<Vec<ActivityPoint>> {
        let scoped = scope_filter(scope, false)?;

        let mut result = self
            .db
            .query(format!(
                "SELECT agent_id, total_amount, created_at FROM inspection \
                 WHERE {} AND created_at >= $since ORDER BY created_at",
                scoped.clause
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .bind(("since", since))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActivityRow> = result.take(0).map_err(DbError::from)?;
        let points = rows
            .into_iter()
            .map(|r| {
                Ok(ActivityPoint {
                    agent_id: parse_uuid("agent", &r.agent_id)?,
                    total_amount: r.total_amount,
                    created_at: r.created_at,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(points)
    }
}
