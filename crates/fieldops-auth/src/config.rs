//! Authentication configuration.

/// The single platform-level account. Matched before any tenant lookup.
#[derive(Debug, Clone)]
pub struct SuperAdminConfig {
    pub code: String,
    pub phone: String,
    /// Argon2id PHC string; the plaintext is never retained.
    pub password_hash: String,
    pub name: String,
}

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 token signing.
    pub jwt_secret: String,
    /// Token lifetime in seconds (default: 86_400 = 24 hours).
    pub token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// `None` disables super-admin login.
    pub super_admin: Option<SuperAdminConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_secs: 86_400,
            jwt_issuer: "fieldops".into(),
            pepper: None,
            min_password_length: 4,
            super_admin: None,
        }
    }
}
