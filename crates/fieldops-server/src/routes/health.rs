use axum::Router;
use axum::extract::State;
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extract::Reply;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    environment: &'static str,
    version: &'static str,
    checked_at: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Reply<Health> {
    let environment = if state.config.app_env.is_development() {
        "development"
    } else {
        "production"
    };
    Reply::ok(
        "Server is running",
        Health {
            status: "ok",
            environment,
            version: env!("CARGO_PKG_VERSION"),
            checked_at: Utc::now(),
        },
    )
}
