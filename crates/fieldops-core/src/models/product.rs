//! Product (catalog item with on-hand stock) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique per tenant, compared case-insensitively.
    pub name: String,
    pub product_type: String,
    pub model: Option<String>,
    /// Unique per tenant when present.
    pub serial_number: Option<String>,
    /// On-hand stock, never negative.
    pub quantity: i64,
    pub price: f64,
    pub min_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub tenant_id: Uuid,
    pub name: String,
    pub product_type: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub min_price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub product_type: Option<String>,
    pub model: Option<String>,
    /// `Some(None)` clears the stored serial number.
    pub serial_number: Option<Option<String>>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
    pub min_price: Option<f64>,
}

/// Which unique key collided in a duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateField {
    Name,
    SerialNumber,
}

impl DuplicateField {
    pub fn message(self) -> &'static str {
        match self {
            DuplicateField::Name => "Product with this name already exists",
            DuplicateField::SerialNumber => "Product with this serial number already exists",
        }
    }
}

/// Static product type catalogue offered to clients.
pub const PRODUCT_TYPES: &[(&str, &str)] = &[
    ("cylinder", "LPG Cylinder"),
    ("regulator", "Regulator"),
    ("hose", "Gas Hose"),
    ("stove", "Gas Stove"),
    ("heater", "Gas Heater"),
    ("other", "Other"),
];
