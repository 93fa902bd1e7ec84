//! Field inspections.

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fieldops_core::inspection::{InspectionPatch, RawInspection};
use fieldops_core::models::claims::Claims;
use fieldops_core::models::inspection::{Inspection, InspectionStatus};
use fieldops_core::repository::{InspectionQuery, Pagination};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{Body, Id, Page, Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inspections", get(list).post(create))
        .route("/inspections/{id}", get(fetch).put(update).delete(remove))
}

/// Query filters shared by the inspection list and CSV export.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilterParams {
    page: Option<u64>,
    limit: Option<u64>,
    #[serde(alias = "deliveryManId")]
    agent_id: Option<Uuid>,
    status: Option<String>,
    #[serde(alias = "startDate")]
    from: Option<String>,
    #[serde(alias = "endDate")]
    to: Option<String>,
    search: Option<String>,
}

impl FilterParams {
    pub(crate) fn into_query(self) -> ApiResult<InspectionQuery> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                InspectionStatus::parse(raw)
                    .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {raw}")))?,
            ),
        };
        Ok(InspectionQuery {
            agent_id: self.agent_id,
            status,
            from: self.from.as_deref().map(|v| date_bound(v, false)).transpose()?,
            to: self.to.as_deref().map(|v| date_bound(v, true)).transpose()?,
            search: self.search,
            pagination: Pagination::page(self.page, self.limit),
        })
    }
}

/// RFC 3339 instants pass through; bare dates widen to the start or the
/// end of that day.
fn date_bound(raw: &str, end_of_day: bool) -> ApiResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("Invalid date: {raw}")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    let time = time.ok_or_else(|| ApiError::bad_request(format!("Invalid date: {raw}")))?;
    Ok(date.and_time(time).and_utc())
}

async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<FilterParams>,
) -> ApiResult<Reply<Page<Inspection>>> {
    let result = state.inspections.list(&claims, params.into_query()?).await?;
    Ok(Reply::ok("Inspections retrieved", result.into()))
}

async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Body(body): Body<RawInspection>,
) -> ApiResult<Reply<Inspection>> {
    let inspection = state.inspections.create(&claims, body, Utc::now()).await?;
    Ok(Reply::created("Inspection submitted", inspection))
}

async fn fetch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Inspection>> {
    let inspection = state.inspections.get(&claims, id).await?;
    Ok(Reply::ok("Inspection retrieved", inspection))
}

async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
    Body(body): Body<InspectionPatch>,
) -> ApiResult<Reply<Inspection>> {
    let inspection = state
        .inspections
        .update(&claims, id, body, Utc::now())
        .await?;
    Ok(Reply::ok("Inspection updated", inspection))
}

async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<()>> {
    state.inspections.delete(&claims, id).await?;
    Ok(Reply::ok("Inspection deleted", ()))
}
