//! fieldops HTTP server: routing, bearer authentication, the response
//! envelope and process configuration.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;

use std::time::Duration;

use axum::Router;
use axum::http::Uri;
use axum::middleware::from_fn_with_state;
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn construct_router(state: AppState) -> Router {
    error::expose_details(state.config.app_env.is_development());

    let public = Router::new()
        .merge(routes::health::routes())
        .merge(routes::auth::public_routes())
        .merge(routes::export::public_routes());

    let protected = Router::new()
        .merge(routes::auth::routes())
        .merge(routes::agent::routes())
        .merge(routes::product::routes())
        .merge(routes::inspection::routes())
        .merge(routes::settings::routes())
        .merge(routes::dashboard::routes())
        .merge(routes::super_admin::routes())
        .merge(routes::upload::routes())
        .merge(routes::export::routes())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", public.merge(protected))
        .nest_service("/uploads", ServeDir::new(state.storage.root()))
        .fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}

/// Periodically delete staged exports whose time is up.
pub async fn sweep_exports(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        if let Err(err) = state.exports.purge_expired(Utc::now()).await {
            tracing::warn!(error = %err, "export sweep failed");
        }
    }
}
