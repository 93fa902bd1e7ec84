//! Per-tenant app settings.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Router};
use fieldops_core::models::claims::Claims;
use fieldops_core::models::tenant::{AppSettings, UpdateAppSettings};
use fieldops_core::scope;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{Body, Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/app-settings", get(fetch).put(update))
        .route("/app-settings/reset", post(reset))
}

/// Tenant admins and agents act on their own tenant; the super admin
/// names one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantParam {
    tenant_id: Option<Uuid>,
}

async fn fetch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(param): Params<TenantParam>,
) -> ApiResult<Reply<AppSettings>> {
    let tenant_id = scope::owning_tenant(&claims, param.tenant_id)?;
    let settings = state.tenants.settings(&claims, tenant_id).await?;
    Ok(Reply::ok("App settings retrieved", settings))
}

async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(param): Params<TenantParam>,
    Body(body): Body<UpdateAppSettings>,
) -> ApiResult<Reply<AppSettings>> {
    let tenant_id = scope::owning_tenant(&claims, param.tenant_id)?;
    let settings = state
        .tenants
        .update_settings(&claims, tenant_id, body)
        .await?;
    Ok(Reply::ok("App settings updated", settings))
}

async fn reset(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(param): Params<TenantParam>,
) -> ApiResult<Reply<AppSettings>> {
    let tenant_id = scope::owning_tenant(&claims, param.tenant_id)?;
    let settings = state.tenants.reset_settings(&claims, tenant_id).await?;
    Ok(Reply::ok("App settings reset to defaults", settings))
}
