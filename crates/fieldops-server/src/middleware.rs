//! Bearer token authentication.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Verify the bearer token and attach its [`Claims`] to the request.
///
/// [`Claims`]: fieldops_core::models::claims::Claims
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let claims = state.auth.verify_token(token)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
