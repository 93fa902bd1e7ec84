//! Authentication service: login, token verification and credential
//! maintenance.

use fieldops_core::error::{FieldOpsError, FieldOpsResult};
use fieldops_core::models::agent::{Agent, UpdateAgent};
use fieldops_core::models::claims::{Claims, Role};
use fieldops_core::models::tenant::Tenant;
use fieldops_core::repository::{AgentRepository, TenantRepository};
use fieldops_core::scope::{self, ResourceKind};
use fieldops_core::validate;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub tenant_code: String,
    pub phone: String,
    pub password: String,
}

/// The authenticated principal, as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
    SuperAdmin { name: String, code: String },
    TenantAdmin { tenant: Tenant },
    Agent { agent: Agent, tenant_name: String },
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub claims: Claims,
    pub principal: Principal,
}

/// What kind of login a code belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeOwner {
    SuperAdmin,
    TenantAdmin {
        name: String,
        #[serde(rename = "tenantId")]
        tenant_id: Uuid,
    },
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<T: TenantRepository, A: AgentRepository> {
    tenants: T,
    agents: A,
    config: AuthConfig,
}

impl<T: TenantRepository, A: AgentRepository> AuthService<T, A> {
    pub fn new(tenants: T, agents: A, config: AuthConfig) -> Self {
        Self {
            tenants,
            agents,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn verify(&self, plain: &str, hash: &str) -> FieldOpsResult<bool> {
        Ok(password::verify_password(
            plain,
            hash,
            self.config.pepper.as_deref(),
        )?)
    }

    /// Check the password policy and hash a new password.
    pub fn hash_new_password(&self, plain: &str) -> FieldOpsResult<String> {
        validate::password(plain, self.config.min_password_length)?;
        Ok(password::hash_password(plain, self.config.pepper.as_deref())?)
    }

    /// Authenticate a (code, phone, password) triple and issue a token.
    ///
    /// Identity classes are tried in order: the configured super admin,
    /// then the tenant admin of the tenant the code resolves to, then
    /// that tenant's agents. Passwords are compared before the active
    /// flag is consulted.
    pub async fn login(&self, input: LoginInput) -> FieldOpsResult<LoginOutput> {
        let code = input.tenant_code.trim().to_ascii_uppercase();
        let phone: String = input.phone.chars().filter(|c| !c.is_whitespace()).collect();

        // 1. Super admin.
        if let Some(sa) = &self.config.super_admin
            && sa.code == code
            && sa.phone == phone
            && self.verify(&input.password, &sa.password_hash)?
        {
            let claims = Claims::super_admin("super_admin", &sa.code);
            info!(role = "super_admin", "login succeeded");
            return self.issue(
                claims,
                Principal::SuperAdmin {
                    name: sa.name.clone(),
                    code: sa.code.clone(),
                },
            );
        }

        // 2. The code must resolve to a tenant; no fallthrough past it.
        let tenant = match self.tenants.get_by_code(&code).await {
            Ok(t) => t,
            Err(FieldOpsError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        // 3. Tenant admin.
        if tenant.admin_phone == phone && self.verify(&input.password, &tenant.admin_password_hash)? {
            if !tenant.is_active {
                return Err(AuthError::AccountInactive.into());
            }
            let claims = Claims::tenant_admin(tenant.id, &tenant.code);
            info!(tenant_id = %tenant.id, role = "tenant_admin", "login succeeded");
            return self.issue(claims, Principal::TenantAdmin { tenant });
        }

        // 4. Agent within that tenant.
        let agent = match self.agents.get_by_phone(tenant.id, &phone).await {
            Ok(a) => a,
            Err(FieldOpsError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };
        if !self.verify(&input.password, &agent.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !agent.is_active || !tenant.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        let claims = Claims::agent(tenant.id, agent.id, &tenant.code);
        info!(tenant_id = %tenant.id, agent_id = %agent.id, role = "agent", "login succeeded");
        self.issue(
            claims,
            Principal::Agent {
                agent,
                tenant_name: tenant.agency_name,
            },
        )
    }

    fn issue(&self, claims: Claims, principal: Principal) -> FieldOpsResult<LoginOutput> {
        let token = token::sign_bearer(&claims, &self.config)?;
        Ok(LoginOutput {
            token,
            expires_in: self.config.token_lifetime_secs,
            claims,
            principal,
        })
    }

    /// Stateless token verification.
    pub fn verify_token(&self, raw: &str) -> FieldOpsResult<Claims> {
        Ok(token::verify_bearer(raw, &self.config)?)
    }

    /// Identify which login class a code belongs to. Inactive tenants are
    /// reported as unknown.
    pub async fn validate_code(&self, code: &str) -> FieldOpsResult<CodeOwner> {
        let code = code.trim().to_ascii_uppercase();
        if self
            .config
            .super_admin
            .as_ref()
            .is_some_and(|sa| sa.code == code)
        {
            return Ok(CodeOwner::SuperAdmin);
        }
        match self.tenants.get_by_code(&code).await {
            Ok(t) if t.is_active => Ok(CodeOwner::TenantAdmin {
                name: t.agency_name,
                tenant_id: t.id,
            }),
            Ok(_) | Err(FieldOpsError::NotFound { .. }) => {
                Err(FieldOpsError::not_found("tenant code", code))
            }
            Err(e) => Err(e),
        }
    }

    /// Current principal for a verified token.
    pub async fn profile(&self, claims: &Claims) -> FieldOpsResult<Principal> {
        match claims.role {
            Role::SuperAdmin => {
                let name = self
                    .config
                    .super_admin
                    .as_ref()
                    .map(|sa| sa.name.clone())
                    .unwrap_or_else(|| "Super Admin".into());
                Ok(Principal::SuperAdmin {
                    name,
                    code: claims.tenant_code.clone(),
                })
            }
            Role::TenantAdmin => {
                let id = claims
                    .tenant_id
                    .ok_or_else(|| AuthError::TokenInvalid("missing tenant".into()))?;
                Ok(Principal::TenantAdmin {
                    tenant: self.tenants.get_by_id(id).await?,
                })
            }
            Role::Agent => {
                let pred = scope::scope_for(claims, ResourceKind::Agent);
                let id = pred
                    .agent_id()
                    .ok_or_else(|| AuthError::TokenInvalid("missing agent".into()))?;
                let agent = self.agents.get_by_id(&pred, id).await?;
                let tenant = self.tenants.get_by_id(agent.tenant_id).await?;
                Ok(Principal::Agent {
                    agent,
                    tenant_name: tenant.agency_name,
                })
            }
        }
    }

    /// Change an agent's password.
    ///
    /// Agents may only change their own and must supply the current
    /// password. Admins within scope may reset it without.
    pub async fn change_agent_password(
        &self,
        claims: &Claims,
        agent_id: Uuid,
        current: Option<&str>,
        new: &str,
    ) -> FieldOpsResult<()> {
        let pred = scope::scope_for(claims, ResourceKind::Agent);
        pred.ensure_allowed(ResourceKind::Agent)?;
        let agent = self.agents.get_by_id(&pred, agent_id).await?;

        if claims.role == Role::Agent {
            let current = current
                .filter(|c| !c.is_empty())
                .ok_or_else(|| FieldOpsError::validation("Current password is required"))?;
            if !self.verify(current, &agent.password_hash)? {
                return Err(FieldOpsError::validation("Current password is incorrect"));
            }
        }

        let password_hash = self.hash_new_password(new)?;
        self.agents
            .update(
                &pred,
                agent.id,
                UpdateAgent {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        info!(agent_id = %agent.id, "agent password changed");
        Ok(())
    }
}
