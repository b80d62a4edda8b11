use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use timeledger_domain::MonthKey;

use super::series::{CategoryHours, HoursSeries, MoneySeries};
pub use super::services::analytics_service::{ActivityRoi, GoalProgress, GoalStatus, ObjectMetrics};

/// Output of one pipeline run. Money is in base-currency units, hours series carry
/// `null` for months without a known hourly rate. Field names are part of the JSON
/// contract consumed by the UI and the alert evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub income_money: MoneySeries,
    pub income_hours: HoursSeries,
    pub expense_money: MoneySeries,
    pub expense_hours: HoursSeries,
    pub objects_maint_hours: HoursSeries,
    pub objects_saved_hours: HoursSeries,
    pub objects_capex_hours: HoursSeries,
    pub activities_saved_hours: HoursSeries,
    pub activities_extra_cost_hours: HoursSeries,
    pub budget_money: MoneySeries,
    pub budget_hours: HoursSeries,
    pub budget_variance_hours_by_month: HoursSeries,
    pub cost_by_category_hours: CategoryHours,
    pub savings_by_category_hours: CategoryHours,
    pub time_cost_hours: HoursSeries,
    pub time_savings_hours: HoursSeries,
    pub time_burn_net: HoursSeries,
    pub net_savings_hours_per_month: Option<f64>,
    pub goals_progress: Vec<GoalProgress>,
    pub activities_roi: Vec<ActivityRoi>,
    pub objects_metrics: Vec<ObjectMetrics>,
    pub forecast_net: Vec<Option<f64>>,
    pub forecast_labels: Vec<MonthKey>,
    pub projected_breakeven_month: Option<MonthKey>,
    pub income_by_source_money: BTreeMap<String, MoneySeries>,
    pub budget_variance_by_category_hours: CategoryHours,
    /// Degraded conversions, e.g. FX pairs carried at parity.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AggregateResult {
    pub fn months(&self) -> Vec<MonthKey> {
        self.time_burn_net.keys().copied().collect()
    }

    pub fn burn_for(&self, month: MonthKey) -> Option<f64> {
        self.time_burn_net.get(&month).copied().flatten()
    }

    pub fn goal(&self, id: uuid::Uuid) -> Option<&GoalProgress> {
        self.goals_progress.iter().find(|goal| goal.goal_id == id)
    }

    pub fn object(&self, id: uuid::Uuid) -> Option<&ObjectMetrics> {
        self.objects_metrics.iter().find(|object| object.object_id == id)
    }
}
