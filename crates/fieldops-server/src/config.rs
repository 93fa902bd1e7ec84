//! Process configuration read from the environment.
//!
//! `.env` is loaded first when present; real environment variables win.
//! Numeric values that fail to parse abort startup rather than silently
//! falling back to defaults.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use fieldops_auth::{AuthConfig, SuperAdminConfig, password};
use fieldops_core::models::tenant::AppSettings;
use fieldops_db::DbConfig;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "fieldops-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("SUPER_ADMIN_CODE, SUPER_ADMIN_PHONE and SUPER_ADMIN_PASSWORD must be set together")]
    IncompleteSuperAdmin,

    #[error("could not hash the super admin password: {0}")]
    Crypto(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_development(self) -> bool {
        self == AppEnv::Development
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub app_env: AppEnv,
    pub auth: AuthConfig,
    pub db: DbConfig,
    /// Root directory of the filesystem object store.
    pub storage_dir: PathBuf,
    /// Base URL prefixed to stored object keys.
    pub storage_public_url: String,
    /// Settings given to newly approved tenants and restored on reset.
    pub default_settings: AppSettings,
    pub export_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let app_env = match get("APP_ENV").as_deref() {
            Some("development") | Some("dev") => AppEnv::Development,
            _ => AppEnv::Production,
        };

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if app_env.is_development() => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let defaults = AuthConfig::default();
        let super_admin = match (
            get("SUPER_ADMIN_CODE"),
            get("SUPER_ADMIN_PHONE"),
            get("SUPER_ADMIN_PASSWORD"),
        ) {
            (Some(code), Some(phone), Some(plain)) => Some(SuperAdminConfig {
                code: code.to_ascii_uppercase(),
                phone,
                password_hash: password::hash_password(&plain, defaults.pepper.as_deref())
                    .map_err(|e| ConfigError::Crypto(e.to_string()))?,
                name: get("SUPER_ADMIN_NAME").unwrap_or_else(|| "Super Admin".into()),
            }),
            (None, None, None) => None,
            _ => return Err(ConfigError::IncompleteSuperAdmin),
        };

        let auth = AuthConfig {
            jwt_secret,
            token_lifetime_secs: parse(&get, "JWT_EXPIRES_IN_SECS", defaults.token_lifetime_secs)?,
            super_admin,
            ..defaults
        };

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: get("DATABASE_URL").unwrap_or(db_defaults.url),
            namespace: get("DATABASE_NS").unwrap_or(db_defaults.namespace),
            database: get("DATABASE_DB").unwrap_or(db_defaults.database),
            username: get("DATABASE_USER"),
            password: get("DATABASE_PASS"),
        };

        let port: u16 = parse(&get, "PORT", 5000)?;
        let settings = AppSettings::default();
        let default_settings = AppSettings {
            hotplate_name: get("DEFAULT_HOTPLATE_NAME").unwrap_or(settings.hotplate_name),
            hotplate_price: parse(&get, "DEFAULT_HOTPLATE_PRICE", settings.hotplate_price)?,
            portable_platform_name: get("DEFAULT_PORTABLE_PLATFORM_NAME")
                .unwrap_or(settings.portable_platform_name),
            portable_platform_price: parse(
                &get,
                "DEFAULT_PORTABLE_PLATFORM_PRICE",
                settings.portable_platform_price,
            )?,
            hotplate_exchange_rate: parse(
                &get,
                "DEFAULT_HOTPLATE_EXCHANGE_RATE",
                settings.hotplate_exchange_rate,
            )?,
        };

        let export_ttl_secs: i64 = parse(&get, "EXPORT_TTL_SECS", 600)?;
        if export_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "EXPORT_TTL_SECS",
                value: export_ttl_secs.to_string(),
            });
        }

        Ok(Self {
            port,
            app_env,
            auth,
            db,
            storage_dir: get("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            storage_public_url: get("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}/uploads")),
            default_settings,
            export_ttl: Duration::seconds(export_ttl_secs),
        })
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[("JWT_SECRET", "secret")]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.app_env, AppEnv::Production);
        assert_eq!(cfg.auth.token_lifetime_secs, 86_400);
        assert!(cfg.auth.super_admin.is_none());
        assert_eq!(cfg.db.url, "mem://");
        assert_eq!(cfg.default_settings, AppSettings::default());
        assert_eq!(cfg.export_ttl, Duration::seconds(600));
    }

    #[test]
    fn production_requires_a_secret() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        let dev = config(&[("APP_ENV", "development")]).unwrap();
        assert!(dev.app_env.is_development());
        assert!(!dev.auth.jwt_secret.is_empty());
    }

    #[test]
    fn malformed_numbers_fail() {
        let err = config(&[("JWT_SECRET", "s"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = config(&[("JWT_SECRET", "s"), ("DEFAULT_HOTPLATE_PRICE", "cheap")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEFAULT_HOTPLATE_PRICE", .. }));
    }

    #[test]
    fn super_admin_password_is_hashed() {
        let cfg = config(&[
            ("JWT_SECRET", "s"),
            ("SUPER_ADMIN_CODE", "root01"),
            ("SUPER_ADMIN_PHONE", "9000000000"),
            ("SUPER_ADMIN_PASSWORD", "pass1234"),
        ])
        .unwrap();
        let sa = cfg.auth.super_admin.unwrap();
        assert_eq!(sa.code, "ROOT01");
        assert!(sa.password_hash.starts_with("$argon2id$"));
        assert!(password::verify_password("pass1234", &sa.password_hash, None).unwrap());
    }

    #[test]
    fn partial_super_admin_is_rejected() {
        let err = config(&[("JWT_SECRET", "s"), ("SUPER_ADMIN_CODE", "ROOT01")]).unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteSuperAdmin));
    }
}
