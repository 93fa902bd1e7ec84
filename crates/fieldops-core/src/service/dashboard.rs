//! Dashboard aggregation for tenant admins and the super admin.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::export::collect_pages;
use crate::charts::{
    self, MonthlyChart, PerformanceChart, SalesChart, SalesPeriod, WeeklyChart,
};
use crate::error::FieldOpsResult;
use crate::models::agent::Agent;
use crate::models::claims::Claims;
use crate::models::inspection::Inspection;
use crate::repository::{
    ActivityPoint, AgentQuery, AgentRepository, InspectionQuery, InspectionRepository,
    Pagination, ProductRepository, RegistrationRepository, TenantRepository,
};
use crate::scope::{self, Capability, Predicate, ResourceKind};

/// Upper bound on agents in the performance table.
const MAX_CHART_AGENTS: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub completed: u64,
    pub issues_found: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub total_inspections: u64,
    pub monthly_inspections: u64,
    pub total_products: u64,
    pub total_agents: u64,
    pub total_sales: f64,
    pub status_breakdown: StatusBreakdown,
    pub recent_inspections: Vec<Inspection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub active_tenants: u64,
    pub active_agents: u64,
    pub total_inspections: u64,
    pub today_inspections: u64,
    pub pending_requests: u64,
    pub total_revenue: f64,
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}

pub struct DashboardService<T, A, P, I, R>
where
    T: TenantRepository,
    A: AgentRepository,
    P: ProductRepository,
    I: InspectionRepository,
    R: RegistrationRepository,
{
    tenants: T,
    agents: A,
    products: P,
    inspections: I,
    registrations: R,
}

impl<T, A, P, I, R> DashboardService<T, A, P, I, R>
where
    T: TenantRepository,
    A: AgentRepository,
    P: ProductRepository,
    I: InspectionRepository,
    R: RegistrationRepository,
{
    pub fn new(tenants: T, agents: A, products: P, inspections: I, registrations: R) -> Self {
        Self {
            tenants,
            agents,
            products,
            inspections,
            registrations,
        }
    }

    /// Statistics for one tenant. The super admin must name the tenant.
    pub async fn tenant_stats(
        &self,
        claims: &Claims,
        tenant_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<TenantStats> {
        scope::require(claims, Capability::ViewTenantDashboard)?;
        let tenant_id = scope::owning_tenant(claims, tenant_id)?;
        self.tenants.get_by_id(tenant_id).await?;
        let pred = Predicate::Tenant(tenant_id);

        let overall = self.inspections.summary(&pred, None).await?;
        let monthly = self
            .inspections
            .summary(&pred, Some(start_of_month(now)))
            .await?;
        let recent = self
            .inspections
            .list(
                &pred,
                InspectionQuery {
                    pagination: Pagination {
                        offset: 0,
                        limit: 5,
                    },
                    ..Default::default()
                },
            )
            .await?;

        Ok(TenantStats {
            total_inspections: overall.total,
            monthly_inspections: monthly.total,
            total_products: self.products.count(&pred).await?,
            total_agents: self.agents.count(&pred, false).await?,
            total_sales: overall.total_sales,
            status_breakdown: StatusBreakdown {
                completed: overall.completed,
                issues_found: overall.issues_found,
            },
            recent_inspections: recent.items,
        })
    }

    pub async fn platform_stats(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<PlatformStats> {
        scope::require(claims, Capability::ViewPlatform)?;
        let all = Predicate::All;

        let overall = self.inspections.summary(&all, None).await?;
        let today = self
            .inspections
            .summary(&all, Some(start_of_day(now)))
            .await?;

        Ok(PlatformStats {
            active_tenants: self.tenants.count_active().await?,
            active_agents: self.agents.count(&all, true).await?,
            total_inspections: overall.total,
            today_inspections: today.total,
            pending_requests: self.registrations.count_pending().await?,
            total_revenue: overall.total_sales,
        })
    }

    /// Inspection counts for each of the last seven days.
    pub async fn weekly_inspections(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<WeeklyChart> {
        let points = self.activity(claims, charts::week_start(now)).await?;
        Ok(charts::weekly(&points, now))
    }

    /// Inspection counts for each of the last six months.
    pub async fn monthly_inspections(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<MonthlyChart> {
        let points = self.activity(claims, charts::months_start(now)).await?;
        Ok(charts::monthly(&points, now))
    }

    pub async fn sales(
        &self,
        claims: &Claims,
        period: SalesPeriod,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<SalesChart> {
        let points = self.activity(claims, period.window_start(now)).await?;
        Ok(charts::sales(&points, now, period))
    }

    /// Activity of every agent the caller manages over the last thirty days.
    pub async fn agent_performance(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> FieldOpsResult<PerformanceChart> {
        scope::require(claims, Capability::ViewTenantDashboard)?;
        let pred = scope::scope_for(claims, ResourceKind::Agent);
        pred.ensure_allowed(ResourceKind::Agent)?;

        let agents: Vec<Agent> = collect_pages(MAX_CHART_AGENTS, |offset| {
            self.agents.list(
                &pred,
                AgentQuery {
                    pagination: Pagination {
                        offset,
                        limit: Pagination::MAX_LIMIT,
                    },
                    ..Default::default()
                },
            )
        })
        .await?;
        let since = now - Duration::days(charts::PERFORMANCE_DAYS);
        let points = self.activity(claims, since).await?;
        Ok(charts::performance(agents, &points))
    }

    async fn activity(
        &self,
        claims: &Claims,
        since: DateTime<Utc>,
    ) -> FieldOpsResult<Vec<ActivityPoint>> {
        let pred = scope::scope_for(claims, ResourceKind::Inspection);
        pred.ensure_allowed(ResourceKind::Inspection)?;
        self.inspections.activity(&pred, since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 15, 42, 7).unwrap();
        assert_eq!(
            start_of_day(now),
            Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }
}
