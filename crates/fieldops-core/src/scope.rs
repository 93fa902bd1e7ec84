//! Access scope resolution.
//!
//! Every read or write against tenant-owned data runs through exactly one
//! [`Predicate`] derived from the caller's [`Claims`]. Ownership mismatches
//! on id lookups surface as `NotFound` so existence never leaks across
//! tenants; role gaps surface as `AuthorizationDenied`.

use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult};
use crate::models::claims::{Claims, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Tenant,
    Agent,
    Product,
    Inspection,
    Registration,
}

/// Row filter imposed by a caller's claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// No restriction.
    All,
    /// Rows owned by one tenant.
    Tenant(Uuid),
    /// Rows owned by one agent. For the agent resource itself this is the
    /// agent's own record.
    Agent { tenant_id: Uuid, agent_id: Uuid },
    /// Role may not touch this resource kind at all.
    Denied,
}

impl Predicate {
    /// Whether a row owned by `tenant_id` (and optionally `agent_id`)
    /// satisfies the predicate.
    pub fn permits(&self, tenant_id: Uuid, agent_id: Option<Uuid>) -> bool {
        match *self {
            Predicate::All => true,
            Predicate::Tenant(t) => t == tenant_id,
            Predicate::Agent {
                tenant_id: t,
                agent_id: a,
            } => t == tenant_id && agent_id == Some(a),
            Predicate::Denied => false,
        }
    }

    /// Reject a `Denied` predicate before any store call is made.
    pub fn ensure_allowed(&self, kind: ResourceKind) -> FieldOpsResult<()> {
        if *self == Predicate::Denied {
            return Err(FieldOpsError::denied(format!(
                "role may not access {}",
                kind.label()
            )));
        }
        Ok(())
    }

    /// Hide a fetched row the caller may not see.
    pub fn check_visible(
        &self,
        kind: ResourceKind,
        id: Uuid,
        tenant_id: Uuid,
        agent_id: Option<Uuid>,
    ) -> FieldOpsResult<()> {
        self.ensure_allowed(kind)?;
        if self.permits(tenant_id, agent_id) {
            Ok(())
        } else {
            Err(FieldOpsError::not_found(kind.label(), id))
        }
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        match *self {
            Predicate::Tenant(t) => Some(t),
            Predicate::Agent { tenant_id, .. } => Some(tenant_id),
            Predicate::All | Predicate::Denied => None,
        }
    }

    pub fn agent_id(&self) -> Option<Uuid> {
        match *self {
            Predicate::Agent { agent_id, .. } => Some(agent_id),
            _ => None,
        }
    }
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Tenant => "tenant",
            ResourceKind::Agent => "agent",
            ResourceKind::Product => "product",
            ResourceKind::Inspection => "inspection",
            ResourceKind::Registration => "registration_request",
        }
    }
}

/// Compute the row filter for `claims` on `kind`.
pub fn scope_for(claims: &Claims, kind: ResourceKind) -> Predicate {
    match claims.role {
        Role::SuperAdmin => Predicate::All,
        Role::TenantAdmin => match (claims.tenant_id, kind) {
            (_, ResourceKind::Registration) => Predicate::Denied,
            (Some(t), _) => Predicate::Tenant(t),
            (None, _) => Predicate::Denied,
        },
        Role::Agent => match (claims.tenant_id, claims.agent_id, kind) {
            (Some(t), Some(a), ResourceKind::Inspection | ResourceKind::Agent) => {
                Predicate::Agent {
                    tenant_id: t,
                    agent_id: a,
                }
            }
            (Some(t), Some(_), ResourceKind::Tenant) => Predicate::Tenant(t),
            _ => Predicate::Denied,
        },
    }
}

/// Tenant that a newly created record will belong to. Only the super
/// admin may name one; everyone else writes into their own tenant.
pub fn owning_tenant(claims: &Claims, requested: Option<Uuid>) -> FieldOpsResult<Uuid> {
    match claims.role {
        Role::SuperAdmin => {
            requested.ok_or_else(|| FieldOpsError::validation("tenantId is required"))
        }
        Role::TenantAdmin | Role::Agent => claims
            .tenant_id
            .ok_or_else(|| FieldOpsError::denied("token carries no tenant")),
    }
}

/// Role-gated actions that sit on top of row scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageProducts,
    ManageAgents,
    AssignProducts,
    CreateInspections,
    DeleteInspections,
    UpdateTenantSettings,
    ViewTenantDashboard,
    ExportInspections,
    ReviewRegistrations,
    ViewPlatform,
}

impl Capability {
    fn allowed(self) -> &'static [Role] {
        use Role::*;
        match self {
            Capability::ManageProducts
            | Capability::ManageAgents
            | Capability::AssignProducts
            | Capability::DeleteInspections
            | Capability::UpdateTenantSettings
            | Capability::ViewTenantDashboard => &[SuperAdmin, TenantAdmin],
            Capability::CreateInspections | Capability::ExportInspections => {
                &[SuperAdmin, TenantAdmin, Agent]
            }
            Capability::ReviewRegistrations | Capability::ViewPlatform => &[SuperAdmin],
        }
    }
}

/// Fail with `AuthorizationDenied` when the caller's role lacks `cap`.
pub fn require(claims: &Claims, cap: Capability) -> FieldOpsResult<()> {
    if cap.allowed().contains(&claims.role) {
        Ok(())
    } else {
        Err(FieldOpsError::denied(format!(
            "{} may not perform {cap:?}",
            claims.role.as_str()
        )))
    }
}
