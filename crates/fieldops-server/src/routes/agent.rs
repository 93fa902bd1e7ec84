//! Delivery men: the agents of a tenant.

use axum::extract::State;
use axum::routing::{get, patch, post, put};
use axum::{Extension, Router};
use chrono::Utc;
use fieldops_core::models::agent::{Agent, ProductAssignment};
use fieldops_core::models::claims::Claims;
use fieldops_core::repository::{AgentQuery, Pagination};
use fieldops_core::service::{AgentPatch, AssignProduct};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::{NewAgentBody, create_agent};
use crate::error::ApiResult;
use crate::extract::{Body, Id, Page, Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/delivery-men", get(list).post(create))
        .route("/delivery-men/{id}", get(fetch).put(update).delete(deactivate))
        .route("/delivery-men/{id}/toggle-status", patch(toggle_status))
        .route("/delivery-men/{id}/assign-product", post(assign_product))
        .route("/delivery-men/{id}/products", get(assigned_products))
        .route("/delivery-men/{id}/password", put(change_password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    is_active: Option<bool>,
}

async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<ListParams>,
) -> ApiResult<Reply<Page<Agent>>> {
    let result = state
        .agents
        .list(
            &claims,
            AgentQuery {
                search: params.search,
                is_active: params.is_active,
                pagination: Pagination::page(params.page, params.limit),
            },
        )
        .await?;
    Ok(Reply::ok("Delivery men retrieved", result.into()))
}

async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Body(body): Body<NewAgentBody>,
) -> ApiResult<Reply<Agent>> {
    create_agent(&state, &claims, body).await
}

async fn fetch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Agent>> {
    let agent = state.agents.get(&claims, id).await?;
    Ok(Reply::ok("Delivery man retrieved", agent))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    name: Option<String>,
    phone: Option<String>,
    is_active: Option<bool>,
}

async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
    Body(body): Body<UpdateBody>,
) -> ApiResult<Reply<Agent>> {
    let agent = state
        .agents
        .update(
            &claims,
            id,
            AgentPatch {
                name: body.name,
                phone: body.phone,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(Reply::ok("Delivery man updated", agent))
}

async fn deactivate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Agent>> {
    let agent = state.agents.deactivate(&claims, id).await?;
    Ok(Reply::ok("Delivery man deactivated", agent))
}

async fn toggle_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Agent>> {
    let agent = state.agents.toggle_active(&claims, id).await?;
    let message = if agent.is_active {
        "Delivery man activated"
    } else {
        "Delivery man deactivated"
    };
    Ok(Reply::ok(message, agent))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody {
    product_id: Uuid,
    quantity: i64,
    price: Option<f64>,
    min_price: Option<f64>,
}

async fn assign_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
    Body(body): Body<AssignBody>,
) -> ApiResult<Reply<Agent>> {
    let agent = state
        .agents
        .assign_product(
            &claims,
            id,
            AssignProduct {
                product_id: body.product_id,
                quantity: body.quantity,
                price: body.price,
                min_price: body.min_price,
            },
            Utc::now(),
        )
        .await?;
    Ok(Reply::ok("Product assigned", agent))
}

async fn assigned_products(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Vec<ProductAssignment>>> {
    let products = state.agents.assigned_products(&claims, id).await?;
    Ok(Reply::ok("Assigned products retrieved", products))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordBody {
    current_password: Option<String>,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
    Body(body): Body<PasswordBody>,
) -> ApiResult<Reply<()>> {
    state
        .auth
        .change_agent_password(&claims, id, body.current_password.as_deref(), &body.new_password)
        .await?;
    Ok(Reply::ok("Password updated", ()))
}
