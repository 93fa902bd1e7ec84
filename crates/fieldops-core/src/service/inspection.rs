//! Inspection lifecycle: create, read, edit, delete.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult};
use crate::inspection::{
    self as normalizer, AgentRef, InspectionError, InspectionPatch, RawInspection,
};
use crate::models::claims::Claims;
use crate::models::inspection::Inspection;
use crate::repository::{
    AgentRepository, InspectionQuery, InspectionRepository, PaginatedResult, TenantRepository,
};
use crate::scope::{self, Capability, Predicate, ResourceKind};

pub struct InspectionService<I: InspectionRepository, A: AgentRepository, T: TenantRepository> {
    inspections: I,
    agents: A,
    tenants: T,
}

impl<I, A, T> InspectionService<I, A, T>
where
    I: InspectionRepository,
    A: AgentRepository,
    T: TenantRepository,
{
    pub fn new(inspections: I, agents: A, tenants: T) -> Self {
        Self {
            inspections,
            agents,
            tenants,
        }
    }

    fn scoped(claims: &Claims) -> FieldOpsResult<Predicate> {
        let pred = scope::scope_for(claims, ResourceKind::Inspection);
        pred.ensure_allowed(ResourceKind::Inspection)?;
        Ok(pred)
    }

    /// Normalize and persist a field submission.
    ///
    /// Running totals on the agent and tenant are bumped afterwards on a
    /// best-effort basis; a failure there is logged and does not fail the
    /// create.
    pub async fn create(
        &self,
        claims: &Claims,
        raw: RawInspection,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<Inspection> {
        scope::require(claims, Capability::CreateInspections)?;

        // 1-2. Resolve the owning tenant and agent.
        let owner = normalizer::resolve_owner(claims, &raw)?;
        let tenant = self.tenants.get_by_id(owner.tenant_id).await?;

        if let AgentRef::Supplied(agent_id) = owner.agent {
            let agent = match self.agents.get_by_id(&Predicate::All, agent_id).await {
                Ok(agent) => agent,
                Err(FieldOpsError::NotFound { .. }) => {
                    return Err(InspectionError::AgentNotFound(agent_id).into());
                }
                Err(err) => return Err(err),
            };
            if agent.tenant_id != tenant.id {
                return Err(InspectionError::TenantMismatch {
                    tenant_id: tenant.id,
                    agent_id,
                }
                .into());
            }
        }

        // 3-7. Validate and derive against the tenant's current settings.
        let input = normalizer::prepare(raw, tenant.id, owner.agent.id(), &tenant.app_settings, now)?;

        // 8. Persist; the store assigns the display id.
        let inspection = self.inspections.create(input).await?;

        // 9. Best-effort running totals.
        self.record_activity(&inspection, 1, inspection.content.total_amount)
            .await;

        info!(
            inspection_id = %inspection.inspection_id,
            tenant_id = %inspection.tenant_id,
            agent_id = %inspection.agent_id,
            status = inspection.content.status.as_str(),
            "inspection created"
        );
        Ok(inspection)
    }

    pub async fn get(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<Inspection> {
        let pred = Self::scoped(claims)?;
        self.inspections.get_by_id(&pred, id).await
    }

    pub async fn list(
        &self,
        claims: &Claims,
        query: InspectionQuery,
    ) -> FieldOpsResult<PaginatedResult<Inspection>> {
        let pred = Self::scoped(claims)?;
        self.inspections.list(&pred, query).await
    }

    /// Apply an edit and re-derive every computed field with the tenant's
    /// current settings. Owner fields never change.
    pub async fn update(
        &self,
        claims: &Claims,
        id: Uuid,
        patch: InspectionPatch,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<Inspection> {
        let pred = Self::scoped(claims)?;
        let current = self.inspections.get_by_id(&pred, id).await?;
        let tenant = self.tenants.get_by_id(current.tenant_id).await?;

        let raw = patch.merge_into(&current.content);
        let content = normalizer::normalize(raw, &tenant.app_settings, now)?;
        let updated = self.inspections.update(&pred, id, content).await?;

        let delta = updated.content.total_amount - current.content.total_amount;
        if delta != 0.0 {
            self.record_sales(updated.agent_id, delta).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<()> {
        scope::require(claims, Capability::DeleteInspections)?;
        let pred = Self::scoped(claims)?;
        let removed = self.inspections.delete(&pred, id).await?;

        self.record_activity(&removed, -1, -removed.content.total_amount)
            .await;
        info!(inspection_id = %removed.inspection_id, "inspection deleted");
        Ok(())
    }

    async fn record_activity(&self, inspection: &Inspection, count: i64, sales: f64) {
        if let Err(err) = self
            .agents
            .record_activity(inspection.agent_id, count, sales)
            .await
        {
            warn!(
                agent_id = %inspection.agent_id,
                inspection_id = %inspection.inspection_id,
                error = %err,
                "agent running totals not updated"
            );
        }
        if let Err(err) = self
            .tenants
            .adjust_counters(inspection.tenant_id, 0, count)
            .await
        {
            warn!(
                tenant_id = %inspection.tenant_id,
                error = %err,
                "tenant inspection counter not updated"
            );
        }
    }

    async fn record_sales(&self, agent_id: Uuid, delta: f64) {
        if let Err(err) = self.agents.record_activity(agent_id, 0, delta).await {
            warn!(agent_id = %agent_id, error = %err, "agent sales total not updated");
        }
    }
}
