//! Tenant profile and per-tenant app settings.

use tracing::info;
use uuid::Uuid;

use crate::error::FieldOpsResult;
use crate::models::claims::Claims;
use crate::models::tenant::{AppSettings, Tenant, UpdateAppSettings, UpdateTenant};
use crate::repository::{PaginatedResult, TenantQuery, TenantRepository};
use crate::scope::{self, Capability, ResourceKind};

pub struct TenantService<T: TenantRepository> {
    tenants: T,
    defaults: AppSettings,
}

impl<T: TenantRepository> TenantService<T> {
    /// `defaults` is what a settings reset restores.
    pub fn new(tenants: T, defaults: AppSettings) -> Self {
        Self { tenants, defaults }
    }

    /// Fetch a tenant the caller may see. Agents see their own tenant.
    pub async fn get(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<Tenant> {
        let pred = scope::scope_for(claims, ResourceKind::Tenant);
        pred.check_visible(ResourceKind::Tenant, id, id, None)?;
        self.tenants.get_by_id(id).await
    }

    pub async fn list(
        &self,
        claims: &Claims,
        query: TenantQuery,
    ) -> FieldOpsResult<PaginatedResult<Tenant>> {
        scope::require(claims, Capability::ViewPlatform)?;
        self.tenants.list(query).await
    }

    pub async fn settings(&self, claims: &Claims, tenant_id: Uuid) -> FieldOpsResult<AppSettings> {
        Ok(self.get(claims, tenant_id).await?.app_settings)
    }

    /// Merge a partial settings update into the tenant's current values.
    pub async fn update_settings(
        &self,
        claims: &Claims,
        tenant_id: Uuid,
        patch: UpdateAppSettings,
    ) -> FieldOpsResult<AppSettings> {
        scope::require(claims, Capability::UpdateTenantSettings)?;
        patch.validate()?;
        let tenant = self.get(claims, tenant_id).await?;
        let merged = patch.apply(&tenant.app_settings);
        self.store_settings(tenant_id, merged).await
    }

    pub async fn reset_settings(
        &self,
        claims: &Claims,
        tenant_id: Uuid,
    ) -> FieldOpsResult<AppSettings> {
        scope::require(claims, Capability::UpdateTenantSettings)?;
        self.get(claims, tenant_id).await?;
        self.store_settings(tenant_id, self.defaults.clone()).await
    }

    async fn store_settings(
        &self,
        tenant_id: Uuid,
        settings: AppSettings,
    ) -> FieldOpsResult<AppSettings> {
        let tenant = self
            .tenants
            .update(
                tenant_id,
                UpdateTenant {
                    app_settings: Some(settings),
                    ..Default::default()
                },
            )
            .await?;
        info!(tenant_id = %tenant_id, "app settings updated");
        Ok(tenant.app_settings)
    }
}
