//! Tenant registration request (staging record awaiting review).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    /// Tenant created but one or more staged agents failed.
    PartiallyApproved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::PartiallyApproved => "partially_approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RegistrationStatus::Pending),
            "approved" => Some(RegistrationStatus::Approved),
            "partially_approved" => Some(RegistrationStatus::PartiallyApproved),
            "rejected" => Some(RegistrationStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != RegistrationStatus::Pending
    }
}

/// A prospective agent embedded in a registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedAgent {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// A staged agent that could not be materialized on approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAgentEntry {
    pub name: String,
    pub phone: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub id: Uuid,
    pub code: String,
    pub agency_name: String,
    pub admin_name: String,
    pub admin_phone: String,
    #[serde(skip_serializing, default)]
    pub admin_password_hash: String,
    pub agents: Vec<StagedAgent>,
    pub status: RegistrationStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
    /// Set once the tenant has been materialized.
    pub tenant_id: Option<Uuid>,
    pub failed_agents: Vec<FailedAgentEntry>,
}

#[derive(Debug, Clone)]
pub struct CreateRegistration {
    pub code: String,
    pub agency_name: String,
    pub admin_name: String,
    pub admin_phone: String,
    pub admin_password_hash: String,
    pub agents: Vec<StagedAgent>,
}

/// Terminal outcome written when a pending request is reviewed.
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub status: RegistrationStatus,
    pub reviewed_by: String,
    pub rejection_reason: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub failed_agents: Vec<FailedAgentEntry>,
}
