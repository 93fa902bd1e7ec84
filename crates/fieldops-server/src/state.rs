use std::sync::Arc;

use fieldops_auth::{AuthService, RegistrationService};
use fieldops_core::service::{
    AgentService, DashboardService, ExportService, InspectionService, ProductService,
    TenantService,
};
use fieldops_db::repository::{
    SurrealAgentRepository, SurrealExportRepository, SurrealInspectionRepository,
    SurrealProductRepository, SurrealRegistrationRepository, SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::ServerConfig;
use crate::storage::LocalObjectStore;

type Tenants = SurrealTenantRepository<Any>;
type Agents = SurrealAgentRepository<Any>;
type Products = SurrealProductRepository<Any>;
type Inspections = SurrealInspectionRepository<Any>;
type Registrations = SurrealRegistrationRepository<Any>;
type Exports = SurrealExportRepository<Any>;

pub type AppState = Arc<State>;

pub struct State {
    pub config: ServerConfig,
    pub auth: AuthService<Tenants, Agents>,
    pub registrations: RegistrationService<Tenants, Agents, Registrations>,
    pub tenants: TenantService<Tenants>,
    pub agents: AgentService<Agents, Products, Tenants>,
    pub products: ProductService<Products>,
    pub inspections: InspectionService<Inspections, Agents, Tenants>,
    pub dashboard: DashboardService<Tenants, Agents, Products, Inspections, Registrations>,
    pub exports: ExportService<Inspections, Agents, Tenants, Exports>,
    pub storage: LocalObjectStore,
}

impl State {
    pub fn new(db: Surreal<Any>, config: ServerConfig) -> Self {
        let tenants = SurrealTenantRepository::new(db.clone());
        let agents = SurrealAgentRepository::new(db.clone());
        let products = SurrealProductRepository::new(db.clone());
        let inspections = SurrealInspectionRepository::new(db.clone());
        let registrations = SurrealRegistrationRepository::new(db.clone());
        let exports = SurrealExportRepository::new(db);

        Self {
            auth: AuthService::new(tenants.clone(), agents.clone(), config.auth.clone()),
            registrations: RegistrationService::new(
                tenants.clone(),
                agents.clone(),
                registrations.clone(),
                config.auth.clone(),
                config.default_settings.clone(),
            ),
            tenants: TenantService::new(tenants.clone(), config.default_settings.clone()),
            agents: AgentService::new(agents.clone(), products.clone(), tenants.clone()),
            products: ProductService::new(products.clone()),
            inspections: InspectionService::new(
                inspections.clone(),
                agents.clone(),
                tenants.clone(),
            ),
            dashboard: DashboardService::new(
                tenants.clone(),
                agents.clone(),
                products,
                inspections.clone(),
                registrations,
            ),
            exports: ExportService::new(inspections, agents, tenants, exports, config.export_ttl),
            storage: LocalObjectStore::new(
                config.storage_dir.clone(),
                config.storage_public_url.clone(),
            ),
            config,
        }
    }
}
