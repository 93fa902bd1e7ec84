//! Agent (delivery man) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product allotment handed to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAssignment {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub min_price: f64,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    /// Owning tenant; immutable after creation.
    pub tenant_id: Uuid,
    pub name: String,
    /// Unique within the owning tenant.
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub total_inspections: i64,
    pub total_sales: f64,
    pub assigned_products: Vec<ProductAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAgent {
    pub tenant_id: Uuid,
    pub name: String,
    pub phone: String,
    /// Argon2id PHC string; hashing happens before the repository.
    pub password_hash: String,
}

/// Fields that can be updated on an existing agent. The tenant reference
/// is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct UpdateAgent {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}
