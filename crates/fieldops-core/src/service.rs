//! Domain services. Each is generic over the repository traits so the
//! core has no dependency on a concrete store.

pub mod agent;
pub mod dashboard;
pub mod export;
pub mod inspection;
pub mod product;
pub mod tenant;

pub use agent::{AgentPatch, AgentService, AssignProduct, NewAgent};
pub use dashboard::{DashboardService, PlatformStats, TenantStats};
pub use export::{CsvExport, Download, ExportService};
pub use inspection::InspectionService;
pub use product::{NewProduct, ProductService};
pub use tenant::TenantService;
