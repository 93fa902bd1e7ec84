//! Tenant (distributor) domain model.
//!
//! A tenant is the top-level isolation boundary. Agents, products and
//! inspections all belong to exactly one tenant, and every scoped query
//! filters on the owning tenant id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult};

const NAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const MAX_PRICE: f64 = 100_000.0;
const MAX_EXCHANGE_RATE: f64 = 10_000.0;

/// Per-tenant configurable price points.
///
/// The exchange rate is read at inspection submission time, so changing
/// it only affects inspections created afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub hotplate_name: String,
    pub hotplate_price: f64,
    pub portable_platform_name: String,
    pub portable_platform_price: f64,
    pub hotplate_exchange_rate: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hotplate_name: "Hi-star Hotplate".into(),
            hotplate_price: 2500.0,
            portable_platform_name: "Portable Kitchen Platform".into(),
            portable_platform_price: 1500.0,
            hotplate_exchange_rate: 450.0,
        }
    }
}

/// Partial update of [`AppSettings`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppSettings {
    pub hotplate_name: Option<String>,
    pub hotplate_price: Option<f64>,
    pub portable_platform_name: Option<String>,
    pub portable_platform_price: Option<f64>,
    pub hotplate_exchange_rate: Option<f64>,
}

impl UpdateAppSettings {
    /// Check every supplied field, collecting all violations into one
    /// validation error.
    pub fn validate(&self) -> FieldOpsResult<()> {
        let mut errors = Vec::new();

        if let Some(name) = &self.hotplate_name
            && !NAME_LEN.contains(&name.trim().chars().count())
        {
            errors.push("Hotplate name must be between 3 and 50 characters");
        }
        if let Some(name) = &self.portable_platform_name
            && !NAME_LEN.contains(&name.trim().chars().count())
        {
            errors.push("Portable platform name must be between 3 and 50 characters");
        }
        if let Some(price) = self.hotplate_price
            && !(0.0..=MAX_PRICE).contains(&price)
        {
            errors.push("Hotplate price must be between 0 and 100,000");
        }
        if let Some(price) = self.portable_platform_price
            && !(0.0..=MAX_PRICE).contains(&price)
        {
            errors.push("Portable platform price must be between 0 and 100,000");
        }
        if let Some(rate) = self.hotplate_exchange_rate
            && !(0.0..=MAX_EXCHANGE_RATE).contains(&rate)
        {
            errors.push("Hotplate exchange rate must be between 0 and 10,000");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FieldOpsError::validation(errors.join(", ")))
        }
    }

    /// Merge onto `current`, producing the settings to persist.
    pub fn apply(self, current: &AppSettings) -> AppSettings {
        AppSettings {
            hotplate_name: self
                .hotplate_name
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| current.hotplate_name.clone()),
            hotplate_price: self.hotplate_price.unwrap_or(current.hotplate_price),
            portable_platform_name: self
                .portable_platform_name
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| current.portable_platform_name.clone()),
            portable_platform_price: self
                .portable_platform_price
                .unwrap_or(current.portable_platform_price),
            hotplate_exchange_rate: self
                .hotplate_exchange_rate
                .unwrap_or(current.hotplate_exchange_rate),
        }
    }
}

/// A distributor organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    /// Immutable business key used at login (historically the SAP code).
    pub code: String,
    pub agency_name: String,
    pub admin_name: String,
    pub admin_phone: String,
    #[serde(skip_serializing, default)]
    pub admin_password_hash: String,
    pub is_active: bool,
    pub app_settings: AppSettings,
    /// Denormalized, eventually consistent.
    pub agent_count: i64,
    /// Denormalized, eventually consistent.
    pub inspection_count: i64,
    pub approved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a tenant. Credentials arrive already hashed.
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub code: String,
    pub agency_name: String,
    pub admin_name: String,
    pub admin_phone: String,
    pub admin_password_hash: String,
    pub app_settings: AppSettings,
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Default)]
pub struct UpdateTenant {
    pub agency_name: Option<String>,
    pub admin_name: Option<String>,
    pub is_active: Option<bool>,
    pub app_settings: Option<AppSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_keeps_unset_fields() {
        let current = AppSettings::default();
        let merged = UpdateAppSettings {
            hotplate_exchange_rate: Some(600.0),
            ..Default::default()
        }
        .apply(&current);

        assert_eq!(merged.hotplate_exchange_rate, 600.0);
        assert_eq!(merged.hotplate_name, current.hotplate_name);
        assert_eq!(merged.portable_platform_price, 1500.0);
    }

    #[test]
    fn out_of_range_values_are_all_reported() {
        let err = UpdateAppSettings {
            hotplate_name: Some("ab".into()),
            hotplate_exchange_rate: Some(20_000.0),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Hotplate name"), "{msg}");
        assert!(msg.contains("exchange rate"), "{msg}");
    }
}
