//! fieldops auth: password hashing, JWT issuance/validation, login
//! orchestration and the tenant registration workflow.

pub mod config;
pub mod error;
pub mod password;
pub mod registration;
pub mod service;
pub mod token;

pub use config::{AuthConfig, SuperAdminConfig};
pub use error::AuthError;
pub use registration::{RegistrationInput, RegistrationService, WorkflowError};
pub use service::{AuthService, LoginInput, LoginOutput};
pub use token::BearerClaims;
