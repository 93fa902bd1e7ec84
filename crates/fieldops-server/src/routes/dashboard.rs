//! Role-scoped dashboard statistics and chart series.

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};
use chrono::Utc;
use fieldops_core::charts::{MonthlyChart, PerformanceChart, SalesChart, SalesPeriod, WeeklyChart};
use fieldops_core::error::FieldOpsError;
use fieldops_core::models::claims::Claims;
use fieldops_core::service::TenantStats;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/charts/weekly-inspections", get(weekly))
        .route("/charts/monthly-inspections", get(monthly))
        .route("/charts/sales-data", get(sales))
        .route("/charts/delivery-performance", get(performance))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsParams {
    tenant_id: Option<Uuid>,
}

async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<StatsParams>,
) -> ApiResult<Reply<TenantStats>> {
    let stats = state
        .dashboard
        .tenant_stats(&claims, params.tenant_id, Utc::now())
        .await?;
    Ok(Reply::ok("Dashboard statistics retrieved", stats))
}

async fn weekly(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Reply<WeeklyChart>> {
    let chart = state.dashboard.weekly_inspections(&claims, Utc::now()).await?;
    Ok(Reply::ok("Weekly chart data fetched successfully", chart))
}

async fn monthly(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Reply<MonthlyChart>> {
    let chart = state.dashboard.monthly_inspections(&claims, Utc::now()).await?;
    Ok(Reply::ok("Monthly chart data fetched successfully", chart))
}

#[derive(Debug, Deserialize)]
struct SalesParams {
    period: Option<String>,
}

async fn sales(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<SalesParams>,
) -> ApiResult<Reply<SalesChart>> {
    let period = match params.period.as_deref() {
        None => SalesPeriod::default(),
        Some(raw) => SalesPeriod::parse(raw).ok_or_else(|| {
            FieldOpsError::validation("period must be weekly or monthly")
        })?,
    };
    let chart = state.dashboard.sales(&claims, period, Utc::now()).await?;
    Ok(Reply::ok("Sales chart data fetched successfully", chart))
}

async fn performance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Reply<PerformanceChart>> {
    let chart = state.dashboard.agent_performance(&claims, Utc::now()).await?;
    Ok(Reply::ok("Delivery performance data fetched successfully", chart))
}
