//! Error types shared by every fieldops crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldOpsError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FieldOpsError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }
}

pub type FieldOpsResult<T> = Result<T, FieldOpsError>;

/// Stock movement failures raised by product assignment.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Only {available} units available in stock")]
    InsufficientStock { available: i64 },

    #[error("quantity must be greater than zero")]
    InvalidQuantity,
}

impl From<StockError> for FieldOpsError {
    fn from(err: StockError) -> Self {
        FieldOpsError::Validation {
            message: err.to_string(),
        }
    }
}
