//! Platform administration: tenant review and oversight.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Router};
use chrono::Utc;
use fieldops_core::models::agent::Agent;
use fieldops_core::models::claims::Claims;
use fieldops_core::models::registration::{RegistrationRequest, RegistrationStatus};
use fieldops_core::models::tenant::Tenant;
use fieldops_core::repository::{Pagination, TenantQuery};
use fieldops_core::service::PlatformStats;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extract::{Body, Id, Page, Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/super-admin/distributors", get(list_tenants))
        .route("/super-admin/distributors/{id}", get(fetch_tenant))
        .route("/super-admin/distributor-requests", get(list_requests))
        .route("/super-admin/distributor-requests/{id}", get(fetch_request))
        .route("/super-admin/approve-distributor/{id}", post(approve))
        .route("/super-admin/reject-distributor/{id}", post(reject))
        .route("/super-admin/dashboard-stats", get(stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantParams {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    is_active: Option<bool>,
}

async fn list_tenants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<TenantParams>,
) -> ApiResult<Reply<Page<Tenant>>> {
    let result = state
        .tenants
        .list(
            &claims,
            TenantQuery {
                search: params.search,
                is_active: params.is_active,
                pagination: Pagination::page(params.page, params.limit),
            },
        )
        .await?;
    Ok(Reply::ok("Distributors retrieved", result.into()))
}

async fn fetch_tenant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Tenant>> {
    let tenant = state.tenants.get(&claims, id).await?;
    Ok(Reply::ok("Distributor retrieved", tenant))
}

#[derive(Debug, Deserialize)]
struct RequestParams {
    page: Option<u64>,
    limit: Option<u64>,
    /// Defaults to `pending`; `all` lifts the filter.
    status: Option<String>,
}

async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<RequestParams>,
) -> ApiResult<Reply<Page<RegistrationRequest>>> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => Some(RegistrationStatus::Pending),
        Some("all") => None,
        Some(raw) => Some(
            RegistrationStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {raw}")))?,
        ),
    };
    let result = state
        .registrations
        .list(&claims, status, Pagination::page(params.page, params.limit))
        .await?;
    Ok(Reply::ok("Registration requests retrieved", result.into()))
}

async fn fetch_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<RegistrationRequest>> {
    let request = state.registrations.get(&claims, id).await?;
    Ok(Reply::ok("Registration request retrieved", request))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalReply {
    request: RegistrationRequest,
    tenant: Tenant,
    agents: Vec<Agent>,
}

async fn approve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<ApprovalReply>> {
    let outcome = state.registrations.approve(&claims, id).await?;
    let message = match outcome.request.status {
        RegistrationStatus::PartiallyApproved => {
            "Distributor approved; some delivery men could not be created"
        }
        _ => "Distributor approved",
    };
    Ok(Reply::ok(
        message,
        ApprovalReply {
            request: outcome.request,
            tenant: outcome.tenant,
            agents: outcome.agents,
        },
    ))
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    reason: Option<String>,
}

async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
    body: Result<Body<RejectBody>, ApiError>,
) -> ApiResult<Reply<RegistrationRequest>> {
    // The reason is optional, so an absent body is fine.
    let reason = body.ok().and_then(|Body(b)| b.reason);
    let request = state.registrations.reject(&claims, id, reason).await?;
    Ok(Reply::ok("Distributor request rejected", request))
}

async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Reply<PlatformStats>> {
    let stats = state.dashboard.platform_stats(&claims, Utc::now()).await?;
    Ok(Reply::ok("Platform statistics retrieved", stats))
}
