//! Inspection domain model.
//!
//! An inspection embeds snapshots (consumer, line items, location) rather
//! than live references, so later edits to products or agents never
//! rewrite historical records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub name: String,
    pub consumer_number: String,
    pub mobile_number: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyAnswer {
    Yes,
    No,
}

impl SafetyAnswer {
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyAnswer::Yes => "yes",
            SafetyAnswer::No => "no",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyQuestion {
    /// Zero-based ordinal of the question in the checklist.
    pub question_id: u32,
    pub question: String,
    pub answer: SafetyAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionImage {
    pub image_id: String,
    pub image_url: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Completed,
    IssuesFound,
}

impl InspectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InspectionStatus::Completed => "completed",
            InspectionStatus::IssuesFound => "issues_found",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(InspectionStatus::Completed),
            "issues_found" => Some(InspectionStatus::IssuesFound),
            _ => None,
        }
    }
}

/// The normalized body of an inspection: raw inputs plus every derived
/// field. Produced by [`crate::inspection::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionContent {
    pub consumer: Consumer,
    pub safety_questions: Vec<SafetyQuestion>,
    pub suraksha_hose_due_date: Option<String>,
    pub images: Vec<InspectionImage>,
    pub products: Vec<LineItem>,
    pub hotplate_exchange: bool,
    pub other_discount: f64,
    pub subtotal_amount: f64,
    pub total_discount: f64,
    pub total_amount: f64,
    pub location: Option<Location>,
    pub status: InspectionStatus,
    pub passed_questions: u32,
    pub failed_questions: u32,
    pub inspection_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: Uuid,
    /// Human-readable sequential identifier, e.g. `INS-2024-0011`.
    pub inspection_id: String,
    pub tenant_id: Uuid,
    pub agent_id: Uuid,
    #[serde(flatten)]
    pub content: InspectionContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInspection {
    pub tenant_id: Uuid,
    pub agent_id: Uuid,
    pub content: InspectionContent,
}
