//! Time-boxed CSV export entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    pub id: Uuid,
    pub owner: String,
    pub file_name: String,
    #[serde(skip_serializing, default)]
    pub csv: String,
    pub record_count: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ExportEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct CreateExport {
    /// Subject id of the caller that produced the export.
    pub owner: String,
    pub file_name: String,
    pub csv: String,
    pub record_count: u64,
    pub expires_at: DateTime<Utc>,
}
