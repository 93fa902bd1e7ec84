//! CSV export of inspections, direct or staged for a one-shot download.

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use chrono::{DateTime, Utc};
use fieldops_core::models::claims::Claims;
use fieldops_core::service::Download;
use serde::Serialize;
use uuid::Uuid;

use super::inspection::FilterParams;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Id, Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/export/csv", get(download_now).post(stage))
}

/// The download link carries its own capability: the unguessable id.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/export/download/{id}", get(download_staged))
}

fn csv_response(file_name: &str, csv: String) -> Response {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        csv,
    )
        .into_response()
}

async fn download_now(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<FilterParams>,
) -> ApiResult<Response> {
    let export = state
        .exports
        .render(&claims, params.into_query()?, Utc::now())
        .await?;
    Ok(csv_response(&export.file_name, export.csv))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Staged {
    export_id: Uuid,
    file_name: String,
    download_url: String,
    record_count: u64,
    expires_at: DateTime<Utc>,
}

async fn stage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<FilterParams>,
) -> ApiResult<Reply<Staged>> {
    let entry = state
        .exports
        .stage(&claims, params.into_query()?, Utc::now())
        .await?;
    Ok(Reply::created(
        "Export ready for download",
        Staged {
            export_id: entry.id,
            download_url: format!("/api/export/download/{}", entry.id),
            file_name: entry.file_name,
            record_count: entry.record_count,
            expires_at: entry.expires_at,
        },
    ))
}

async fn download_staged(State(state): State<AppState>, Id(id): Id) -> ApiResult<Response> {
    match state.exports.take(id, Utc::now()).await? {
        Download::Ready(entry) => Ok(csv_response(&entry.file_name, entry.csv)),
        Download::Expired => Err(ApiError::gone("Export has expired")),
    }
}
