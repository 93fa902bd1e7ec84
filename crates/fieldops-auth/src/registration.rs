//! Tenant onboarding: public registration and super-admin review.
//!
//! A request moves `pending -> approved | partially_approved | rejected`
//! exactly once. Approval creates the tenant first and then each staged
//! agent; agent failures are collected rather than rolled back, and the
//! request is marked `partially_approved` with the failed entries.

use fieldops_core::error::{FieldOpsError, FieldOpsResult};
use fieldops_core::models::agent::{Agent, CreateAgent};
use fieldops_core::models::claims::Claims;
use fieldops_core::models::registration::{
    CreateRegistration, FailedAgentEntry, RegistrationRequest, RegistrationStatus,
    ReviewDecision, StagedAgent,
};
use fieldops_core::models::tenant::{AppSettings, CreateTenant, Tenant};
use fieldops_core::repository::{
    AgentRepository, PaginatedResult, Pagination, RegistrationRepository, TenantRepository,
};
use fieldops_core::scope::{self, Capability};
use fieldops_core::validate;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::password;

const DEFAULT_REJECTION_REASON: &str = "No reason provided";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Request already processed")]
    AlreadyProcessed,

    #[error("Tenant code {0} is already registered or pending")]
    DuplicateTenantCode(String),
}

impl From<WorkflowError> for FieldOpsError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::AlreadyProcessed => FieldOpsError::Validation {
                message: err.to_string(),
            },
            WorkflowError::DuplicateTenantCode(_) => FieldOpsError::AlreadyExists {
                entity: "tenant code".into(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentInput {
    pub name: String,
    pub phone: String,
    pub password: String,
}

/// Public registration form, with plaintext passwords.
#[derive(Debug, Clone)]
pub struct RegistrationInput {
    pub code: String,
    pub agency_name: String,
    /// Falls back to the agency name when absent.
    pub admin_name: Option<String>,
    pub admin_phone: String,
    pub admin_password: String,
    pub agents: Vec<AgentInput>,
}

/// Result of approving a request.
#[derive(Debug)]
pub struct ApprovalOutcome {
    pub request: RegistrationRequest,
    pub tenant: Tenant,
    pub agents: Vec<Agent>,
}

pub struct RegistrationService<T, A, R>
where
    T: TenantRepository,
    A: AgentRepository,
    R: RegistrationRepository,
{
    tenants: T,
    agents: A,
    requests: R,
    config: AuthConfig,
    default_settings: AppSettings,
}

impl<T, A, R> RegistrationService<T, A, R>
where
    T: TenantRepository,
    A: AgentRepository,
    R: RegistrationRepository,
{
    pub fn new(
        tenants: T,
        agents: A,
        requests: R,
        config: AuthConfig,
        default_settings: AppSettings,
    ) -> Self {
        Self {
            tenants,
            agents,
            requests,
            config,
            default_settings,
        }
    }

    fn hash(&self, plain: &str) -> FieldOpsResult<String> {
        validate::password(plain, self.config.min_password_length)?;
        Ok(password::hash_password(plain, self.config.pepper.as_deref())?)
    }

    /// Stage a registration. Every password is hashed before anything is
    /// stored.
    pub async fn submit(&self, input: RegistrationInput) -> FieldOpsResult<RegistrationRequest> {
        let code = validate::tenant_code(&input.code)?;
        let agency_name = validate::name(&input.agency_name)?;
        let admin_name = match input.admin_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => validate::name(name)?,
            _ => agency_name.clone(),
        };
        let admin_phone = validate::phone(&input.admin_phone)?;

        let mut seen = vec![admin_phone.clone()];
        let mut staged = Vec::with_capacity(input.agents.len());
        for agent in &input.agents {
            let phone = validate::phone(&agent.phone)?;
            if seen.contains(&phone) {
                return Err(FieldOpsError::validation(format!(
                    "phone {phone} appears more than once"
                )));
            }
            seen.push(phone.clone());
            staged.push(StagedAgent {
                name: validate::name(&agent.name)?,
                phone,
                password_hash: String::new(),
            });
        }

        // A code is taken by any existing tenant or another pending request.
        match self.tenants.get_by_code(&code).await {
            Ok(_) => return Err(WorkflowError::DuplicateTenantCode(code).into()),
            Err(FieldOpsError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        if self.requests.find_pending_by_code(&code).await?.is_some() {
            return Err(WorkflowError::DuplicateTenantCode(code).into());
        }

        let admin_password_hash = self.hash(&input.admin_password)?;
        for (slot, agent) in staged.iter_mut().zip(&input.agents) {
            slot.password_hash = self.hash(&agent.password)?;
        }

        let request = self
            .requests
            .create(CreateRegistration {
                code,
                agency_name,
                admin_name,
                admin_phone,
                admin_password_hash,
                agents: staged,
            })
            .await?;

        info!(request_id = %request.id, code = %request.code, "registration submitted");
        Ok(request)
    }

    pub async fn get(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<RegistrationRequest> {
        scope::require(claims, Capability::ReviewRegistrations)?;
        self.requests.get_by_id(id).await
    }

    pub async fn list(
        &self,
        claims: &Claims,
        status: Option<RegistrationStatus>,
        pagination: Pagination,
    ) -> FieldOpsResult<PaginatedResult<RegistrationRequest>> {
        scope::require(claims, Capability::ReviewRegistrations)?;
        self.requests.list(status, pagination).await
    }

    async fn pending(&self, id: Uuid) -> FieldOpsResult<RegistrationRequest> {
        let request = self.requests.get_by_id(id).await?;
        if request.status.is_terminal() {
            return Err(WorkflowError::AlreadyProcessed.into());
        }
        Ok(request)
    }

    /// Materialize the tenant and its agents, copying staged hashes
    /// verbatim.
    pub async fn approve(
        &self,
        claims: &Claims,
        id: Uuid,
    ) -> FieldOpsResult<ApprovalOutcome> {
        scope::require(claims, Capability::ReviewRegistrations)?;
        let request = self.pending(id).await?;

        // 1. Tenant. A failure here leaves the request pending.
        let tenant = self
            .tenants
            .create(CreateTenant {
                code: request.code.clone(),
                agency_name: request.agency_name.clone(),
                admin_name: request.admin_name.clone(),
                admin_phone: request.admin_phone.clone(),
                admin_password_hash: request.admin_password_hash.clone(),
                app_settings: self.default_settings.clone(),
            })
            .await?;

        // 2. Agents, collecting failures.
        let mut created = Vec::new();
        let mut failed = Vec::new();
        for staged in &request.agents {
            let result = self
                .agents
                .create(CreateAgent {
                    tenant_id: tenant.id,
                    name: staged.name.clone(),
                    phone: staged.phone.clone(),
                    password_hash: staged.password_hash.clone(),
                })
                .await;
            match result {
                Ok(agent) => created.push(agent),
                Err(err) => {
                    warn!(
                        request_id = %id,
                        phone = %staged.phone,
                        error = %err,
                        "staged agent not created"
                    );
                    failed.push(FailedAgentEntry {
                        name: staged.name.clone(),
                        phone: staged.phone.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if !created.is_empty()
            && let Err(err) = self
                .tenants
                .adjust_counters(tenant.id, created.len() as i64, 0)
                .await
        {
            warn!(tenant_id = %tenant.id, error = %err, "agent counter update failed");
        }

        // 3. Terminal status.
        let status = if failed.is_empty() {
            RegistrationStatus::Approved
        } else {
            RegistrationStatus::PartiallyApproved
        };
        let decision = ReviewDecision {
            status,
            reviewed_by: claims.subject_id.clone(),
            rejection_reason: None,
            tenant_id: Some(tenant.id),
            failed_agents: failed,
        };
        let Some(request) = self.requests.complete(id, decision).await? else {
            error!(
                request_id = %id,
                tenant_id = %tenant.id,
                "request was processed concurrently after tenant creation"
            );
            return Err(WorkflowError::AlreadyProcessed.into());
        };

        info!(
            request_id = %id,
            tenant_id = %tenant.id,
            status = status.as_str(),
            "registration approved"
        );
        Ok(ApprovalOutcome {
            request,
            tenant,
            agents: created,
        })
    }

    /// Mark a pending request rejected. Never creates records.
    pub async fn reject(
        &self,
        claims: &Claims,
        id: Uuid,
        reason: Option<String>,
    ) -> FieldOpsResult<RegistrationRequest> {
        scope::require(claims, Capability::ReviewRegistrations)?;
        self.pending(id).await?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.into());
        let decision = ReviewDecision {
            status: RegistrationStatus::Rejected,
            reviewed_by: claims.subject_id.clone(),
            rejection_reason: Some(reason),
            tenant_id: None,
            failed_agents: Vec::new(),
        };

        let request = self
            .requests
            .complete(id, decision)
            .await?
            .ok_or(WorkflowError::AlreadyProcessed)?;
        info!(request_id = %id, "registration rejected");
        Ok(request)
    }
}
