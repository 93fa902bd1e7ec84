//! JWT access token issuance and verification.

use chrono::Utc;
use fieldops_core::models::claims::{Claims, Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Wire form of [`Claims`] plus the registered JWT fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Subject: tenant id for admins, agent id for agents.
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    pub tenant_code: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per token; two logins never share a token.
    pub jti: String,
}

impl From<BearerClaims> for Claims {
    fn from(c: BearerClaims) -> Self {
        Claims {
            subject_id: c.sub,
            role: c.role,
            tenant_id: c.tenant_id,
            agent_id: c.agent_id,
            tenant_code: c.tenant_code,
        }
    }
}

/// Issue a signed HS256 JWT for `claims`.
pub fn sign_bearer(claims: &Claims, config: &AuthConfig) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::Crypto("JWT secret is not configured".into()));
    }
    let now = Utc::now().timestamp();
    let token_claims = BearerClaims {
        sub: claims.subject_id.clone(),
        role: claims.role,
        tenant_id: claims.tenant_id,
        agent_id: claims.agent_id,
        tenant_code: claims.tenant_code.clone(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + config.token_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &token_claims, &key)
        .map_err(|e| AuthError::Crypto(format!("signing bearer token: {e}")))
}

/// Decode and verify an HS256 JWT access token.
pub fn decode_bearer(
    token: &str,
    config: &AuthConfig,
) -> Result<BearerClaims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
    validation.leeway = 0;

    jsonwebtoken::decode::<BearerClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Validate a token (signature, expiry, issuer) and return the verified
/// identity. Purely stateless: no store lookup is performed.
pub fn verify_bearer(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    decode_bearer(token, config).map(Claims::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-at-least-32-bytes-long!!".into(),
            jwt_issuer: "fieldops-test".into(),
            ..Default::default()
        }
    }

    #[test]
    fn jwt_roundtrip_preserves_claims() {
        let config = test_config();
        let claims = Claims::agent(Uuid::new_v4(), Uuid::new_v4(), "AG001");

        let token = sign_bearer(&claims, &config).unwrap();
        let decoded = verify_bearer(&token, &config).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn each_token_is_distinct_and_lives_a_day() {
        let config = test_config();
        let claims = Claims::super_admin("super_admin", "000000");

        let t1 = sign_bearer(&claims, &config).unwrap();
        let t2 = sign_bearer(&claims, &config).unwrap();

        let c1 = decode_bearer(&t1, &config).unwrap();
        let c2 = decode_bearer(&t2, &config).unwrap();
        assert_ne!(c1.jti, c2.jti);
        assert_eq!(c1.exp - c1.iat, 86_400);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let config = test_config();
        let now = Utc::now().timestamp();
        let stale = BearerClaims {
            sub: "x".into(),
            role: Role::TenantAdmin,
            tenant_id: None,
            agent_id: None,
            tenant_code: "AG001".into(),
            iss: config.jwt_issuer.clone(),
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_bearer(&token, &config),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let config = test_config();
        let claims = Claims::tenant_admin(Uuid::new_v4(), "AG001");
        let token = sign_bearer(&claims, &config).unwrap();

        let other = AuthConfig {
            jwt_secret: "a-completely-different-secret-value".into(),
            ..test_config()
        };
        assert!(matches!(
            verify_bearer(&token, &other),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            verify_bearer("not.a.jwt", &config),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
