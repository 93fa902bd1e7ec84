//! Chart series over recent inspection activity.
//!
//! Days and months are bucketed in UTC. Every series carries one entry per
//! period in its window, zero-filled, oldest first.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::agent::Agent;
use crate::repository::ActivityPoint;

pub const WEEK_DAYS: i64 = 7;
pub const MONTHS: i32 = 6;
/// Look-back window of the agent performance table.
pub const PERFORMANCE_DAYS: i64 = 30;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Granularity of the sales series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SalesPeriod {
    #[default]
    Weekly,
    Monthly,
}

impl SalesPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Weekly => week_start(now),
            Self::Monthly => months_start(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    /// Short weekday name.
    pub day: String,
    pub count: u64,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    pub month: &'static str,
    pub count: u64,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesPoint {
    pub period: String,
    pub sales: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPerformance {
    pub id: Uuid,
    pub name: String,
    pub inspections: u64,
    pub sales: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyChart {
    pub weekly_data: Vec<DayCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyChart {
    pub monthly_data: Vec<MonthCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesChart {
    pub sales_data: Vec<SalesPoint>,
    pub period: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceChart {
    pub performance_data: Vec<AgentPerformance>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    count: u64,
    sales: f64,
}

impl Tally {
    fn add(&mut self, point: &ActivityPoint) {
        self.count += 1;
        self.sales += point.total_amount;
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn recent_days(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..WEEK_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

fn recent_months(now: DateTime<Utc>) -> Vec<(i32, u32)> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..MONTHS)
        .rev()
        .map(|back| {
            let n = current - back;
            (n.div_euclid(12), n.rem_euclid(12) as u32 + 1)
        })
        .collect()
}

fn month_label(month: u32) -> &'static str {
    MONTH_LABELS[(month as usize + 11) % 12]
}

/// Midnight starting the oldest day of the weekly window.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of(now.date_naive() - Duration::days(WEEK_DAYS - 1))
}

/// First instant of the oldest month in the monthly window.
pub fn months_start(now: DateTime<Utc>) -> DateTime<Utc> {
    recent_months(now)
        .first()
        .and_then(|&(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
        .map_or(now, start_of)
}

fn daily(points: &[ActivityPoint], now: DateTime<Utc>) -> Vec<(NaiveDate, Tally)> {
    let mut by_day: HashMap<NaiveDate, Tally> = HashMap::new();
    for point in points {
        by_day.entry(point.created_at.date_naive()).or_default().add(point);
    }
    recent_days(now)
        .into_iter()
        .map(|day| (day, by_day.remove(&day).unwrap_or_default()))
        .collect()
}

fn monthly_tallies(points: &[ActivityPoint], now: DateTime<Utc>) -> Vec<((i32, u32), Tally)> {
    let mut by_month: HashMap<(i32, u32), Tally> = HashMap::new();
    for point in points {
        let key = (point.created_at.year(), point.created_at.month());
        by_month.entry(key).or_default().add(point);
    }
    recent_months(now)
        .into_iter()
        .map(|key| (key, by_month.remove(&key).unwrap_or_default()))
        .collect()
}

pub fn weekly(points: &[ActivityPoint], now: DateTime<Utc>) -> WeeklyChart {
    WeeklyChart {
        weekly_data: daily(points, now)
            .into_iter()
            .map(|(day, tally)| DayCount {
                day: day.format("%a").to_string(),
                count: tally.count,
                date: day.to_string(),
            })
            .collect(),
    }
}

pub fn monthly(points: &[ActivityPoint], now: DateTime<Utc>) -> MonthlyChart {
    MonthlyChart {
        monthly_data: monthly_tallies(points, now)
            .into_iter()
            .map(|((year, month), tally)| MonthCount {
                month: month_label(month),
                count: tally.count,
                year,
            })
            .collect(),
    }
}

pub fn sales(points: &[ActivityPoint], now: DateTime<Utc>, period: SalesPeriod) -> SalesChart {
    let sales_data = match period {
        SalesPeriod::Weekly => daily(points, now)
            .into_iter()
            .map(|(day, tally)| SalesPoint {
                period: day.format("%a").to_string(),
                sales: tally.sales,
                count: tally.count,
            })
            .collect(),
        SalesPeriod::Monthly => monthly_tallies(points, now)
            .into_iter()
            .map(|((_, month), tally)| SalesPoint {
                period: month_label(month).to_string(),
                sales: tally.sales,
                count: tally.count,
            })
            .collect(),
    };
    SalesChart {
        sales_data,
        period: period.as_str(),
    }
}

/// Per-agent totals, busiest first. Agents without activity are listed
/// with zeroes.
pub fn performance(agents: Vec<Agent>, points: &[ActivityPoint]) -> PerformanceChart {
    let mut by_agent: HashMap<Uuid, Tally> = HashMap::new();
    for point in points {
        by_agent.entry(point.agent_id).or_default().add(point);
    }
    let mut performance_data: Vec<AgentPerformance> = agents
        .into_iter()
        .map(|agent| {
            let tally = by_agent.get(&agent.id).copied().unwrap_or_default();
            AgentPerformance {
                id: agent.id,
                name: agent.name,
                inspections: tally.count,
                sales: tally.sales,
            }
        })
        .collect();
    performance_data.sort_by(|a, b| b.inspections.cmp(&a.inspections));
    PerformanceChart { performance_data }
}
