//! Verified identity carried by a bearer token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical role vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    Agent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::Agent => "agent",
        }
    }
}

/// The decoded, verified identity and role bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Tenant id for tenant admins, agent id for agents, a fixed label
    /// for the super admin.
    pub subject_id: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub tenant_code: String,
}

impl Claims {
    pub fn super_admin(subject_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: Role::SuperAdmin,
            tenant_id: None,
            agent_id: None,
            tenant_code: code.into(),
        }
    }

    pub fn tenant_admin(tenant_id: Uuid, code: impl Into<String>) -> Self {
        Self {
            subject_id: tenant_id.to_string(),
            role: Role::TenantAdmin,
            tenant_id: Some(tenant_id),
            agent_id: None,
            tenant_code: code.into(),
        }
    }

    pub fn agent(tenant_id: Uuid, agent_id: Uuid, code: impl Into<String>) -> Self {
        Self {
            subject_id: agent_id.to_string(),
            role: Role::Agent,
            tenant_id: Some(tenant_id),
            agent_id: Some(agent_id),
            tenant_code: code.into(),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}
