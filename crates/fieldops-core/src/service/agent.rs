//! Agent (delivery man) management and product assignment.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult, StockError};
use crate::models::agent::{Agent, CreateAgent, ProductAssignment, UpdateAgent};
use crate::models::claims::Claims;
use crate::repository::{
    AgentQuery, AgentRepository, PaginatedResult, ProductRepository, TenantRepository,
};
use crate::scope::{self, Capability, ResourceKind};
use crate::validate;

/// Input for creating an agent. The password has already been hashed.
#[derive(Debug, Clone)]
pub struct NewAgent {
    /// Honoured only for the super admin.
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
}

/// Edit of an agent's profile. Password changes go through the
/// credential flow instead.
#[derive(Debug, Clone, Default)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct AssignProduct {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Defaults to the product's list price.
    pub price: Option<f64>,
    /// Defaults to the product's minimum price.
    pub min_price: Option<f64>,
}

pub struct AgentService<A: AgentRepository, P: ProductRepository, T: TenantRepository> {
    agents: A,
    products: P,
    tenants: T,
}

impl<A: AgentRepository, P: ProductRepository, T: TenantRepository> AgentService<A, P, T> {
    pub fn new(agents: A, products: P, tenants: T) -> Self {
        Self {
            agents,
            products,
            tenants,
        }
    }

    pub async fn create(&self, claims: &Claims, input: NewAgent) -> FieldOpsResult<Agent> {
        scope::require(claims, Capability::ManageAgents)?;
        let tenant_id = scope::owning_tenant(claims, input.tenant_id)?;
        let name = validate::name(&input.name)?;
        let phone = validate::phone(&input.phone)?;

        // Reject writes into a tenant that does not exist.
        self.tenants.get_by_id(tenant_id).await?;

        let agent = self
            .agents
            .create(CreateAgent {
                tenant_id,
                name,
                phone,
                password_hash: input.password_hash,
            })
            .await?;

        self.bump_agent_count(tenant_id, 1).await;
        info!(agent_id = %agent.id, tenant_id = %tenant_id, "agent created");
        Ok(agent)
    }

    pub async fn get(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<Agent> {
        let pred = scope::scope_for(claims, ResourceKind::Agent);
        pred.ensure_allowed(ResourceKind::Agent)?;
        self.agents.get_by_id(&pred, id).await
    }

    pub async fn list(
        &self,
        claims: &Claims,
        query: AgentQuery,
    ) -> FieldOpsResult<PaginatedResult<Agent>> {
        scope::require(claims, Capability::ManageAgents)?;
        let pred = scope::scope_for(claims, ResourceKind::Agent);
        pred.ensure_allowed(ResourceKind::Agent)?;
        self.agents.list(&pred, query).await
    }

    pub async fn update(&self, claims: &Claims, id: Uuid, patch: AgentPatch) -> FieldOpsResult<Agent> {
        scope::require(claims, Capability::ManageAgents)?;
        let pred = scope::scope_for(claims, ResourceKind::Agent);
        pred.ensure_allowed(ResourceKind::Agent)?;

        let before = self.agents.get_by_id(&pred, id).await?;
        let input = UpdateAgent {
            name: patch.name.as_deref().map(validate::name).transpose()?,
            phone: patch.phone.as_deref().map(validate::phone).transpose()?,
            is_active: patch.is_active,
            password_hash: None,
        };
        let agent = self.agents.update(&pred, id, input).await?;

        if before.is_active != agent.is_active {
            let delta = if agent.is_active { 1 } else { -1 };
            self.bump_agent_count(agent.tenant_id, delta).await;
        }
        Ok(agent)
    }

    /// Flip the active flag.
    pub async fn toggle_active(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<Agent> {
        let current = self.get(claims, id).await?;
        self.update(
            claims,
            id,
            AgentPatch {
                is_active: Some(!current.is_active),
                ..Default::default()
            },
        )
        .await
    }

    /// Soft delete: the record stays, the agent can no longer log in.
    pub async fn deactivate(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<Agent> {
        self.update(
            claims,
            id,
            AgentPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Move stock from a product onto an agent.
    ///
    /// Stock is reserved with a conditional decrement first; if appending
    /// the assignment then fails the reservation is released again.
    pub async fn assign_product(
        &self,
        claims: &Claims,
        agent_id: Uuid,
        input: AssignProduct,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<Agent> {
        scope::require(claims, Capability::AssignProducts)?;
        if input.quantity <= 0 {
            return Err(StockError::InvalidQuantity.into());
        }

        let agent_pred = scope::scope_for(claims, ResourceKind::Agent);
        let agent = self.agents.get_by_id(&agent_pred, agent_id).await?;

        // Product must live in the agent's tenant, whatever the caller's scope.
        let product_pred = scope::Predicate::Tenant(agent.tenant_id);
        let product = self
            .products
            .get_by_id(&product_pred, input.product_id)
            .await?;

        let price = validate::non_negative("price", input.price.unwrap_or(product.price))?;
        let min_price =
            validate::non_negative("minPrice", input.min_price.unwrap_or(product.min_price))?;
        if price < min_price {
            return Err(FieldOpsError::validation(
                "price must not be below minPrice",
            ));
        }

        self.products
            .reserve_stock(&product_pred, product.id, input.quantity)
            .await?;

        let assignment = ProductAssignment {
            product_id: product.id,
            name: product.name.clone(),
            quantity: input.quantity,
            price,
            min_price,
            assigned_at: now,
        };

        match self
            .agents
            .push_assignment(&agent_pred, agent.id, assignment)
            .await
        {
            Ok(agent) => {
                info!(
                    agent_id = %agent.id,
                    product_id = %product.id,
                    quantity = input.quantity,
                    "product assigned"
                );
                Ok(agent)
            }
            Err(err) => {
                if let Err(release) = self.products.release_stock(product.id, input.quantity).await
                {
                    warn!(
                        product_id = %product.id,
                        quantity = input.quantity,
                        error = %release,
                        "failed to release reserved stock"
                    );
                }
                Err(err)
            }
        }
    }

    /// Assignments held by an agent. Agents may read only their own.
    pub async fn assigned_products(
        &self,
        claims: &Claims,
        agent_id: Uuid,
    ) -> FieldOpsResult<Vec<ProductAssignment>> {
        Ok(self.get(claims, agent_id).await?.assigned_products)
    }

    async fn bump_agent_count(&self, tenant_id: Uuid, delta: i64) {
        if let Err(err) = self.tenants.adjust_counters(tenant_id, delta, 0).await {
            warn!(tenant_id = %tenant_id, error = %err, "agent counter update failed");
        }
    }
}
