//! HTTP error mapping and the failure envelope.
//!
//! Every failure answers `{success:false, error, message, details?,
//! timestamp}`. `details` carries the internal error text and is only
//! emitted when the process runs in development mode.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use fieldops_core::error::FieldOpsError;
use serde_json::{Value, json};

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Toggle whether internal error text is sent to clients.
pub fn expose_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    details: Option<String>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "ValidationError",
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "AuthError",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "NotFoundError",
            message: message.into(),
            details: None,
        }
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::GONE,
            kind: "GoneError",
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn envelope(&self, expose: bool) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.kind,
            "message": self.message,
            "timestamp": Utc::now(),
        });
        if expose && let Some(details) = &self.details {
            body["details"] = Value::String(details.clone());
        }
        body
    }
}

impl From<FieldOpsError> for ApiError {
    fn from(err: FieldOpsError) -> Self {
        let (status, kind, message) = match &err {
            FieldOpsError::NotFound { entity, .. } => (
                StatusCode::NOT_FOUND,
                "NotFoundError",
                format!("{} not found", capitalize(entity)),
            ),
            FieldOpsError::AlreadyExists { entity } => (
                StatusCode::CONFLICT,
                "ConflictError",
                format!("{} already exists", capitalize(entity)),
            ),
            FieldOpsError::AuthenticationFailed { reason } => (
                StatusCode::UNAUTHORIZED,
                "AuthError",
                capitalize(reason),
            ),
            FieldOpsError::AuthorizationDenied { reason } => {
                (StatusCode::FORBIDDEN, "AuthError", capitalize(reason))
            }
            FieldOpsError::Validation { message } => {
                (StatusCode::BAD_REQUEST, "ValidationError", message.clone())
            }
            FieldOpsError::Database(_)
            | FieldOpsError::Crypto(_)
            | FieldOpsError::Storage(_)
            | FieldOpsError::Internal(_) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "Internal server error".to_string(),
                )
            }
        };
        Self {
            status,
            kind,
            message,
            details: Some(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.envelope(EXPOSE_DETAILS.load(Ordering::Relaxed));
        (self.status, Json(body)).into_response()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status() {
        let cases = [
            (FieldOpsError::not_found("inspection", "x"), StatusCode::NOT_FOUND),
            (
                FieldOpsError::AlreadyExists {
                    entity: "agent phone".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                FieldOpsError::AuthenticationFailed {
                    reason: "invalid credentials".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (FieldOpsError::denied("agent may not"), StatusCode::FORBIDDEN),
            (FieldOpsError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                FieldOpsError::Database("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_text_only_in_development() {
        let err = ApiError::from(FieldOpsError::Database("connection reset".into()));

        let hidden = err.envelope(false);
        assert_eq!(hidden["success"], false);
        assert_eq!(hidden["error"], "InternalError");
        assert_eq!(hidden["message"], "Internal server error");
        assert!(hidden.get("details").is_none());

        let shown = err.envelope(true);
        assert!(shown["details"].as_str().unwrap().contains("connection reset"));
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = ApiError::from(FieldOpsError::AlreadyExists {
            entity: "product name".into(),
        });
        assert_eq!(err.envelope(false)["message"], "Product name already exists");
    }
}
