//! Authentication error types.

use fieldops_core::error::FieldOpsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for FieldOpsError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => FieldOpsError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::AccountInactive => FieldOpsError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => FieldOpsError::Crypto(msg),
        }
    }
}
