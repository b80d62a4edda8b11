use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use timeledger_domain::MonthKey;
use uuid::Uuid;

use crate::core::result::AggregateResult;
use crate::core::series::{CategoryHours, HoursSeries, MoneySeries};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDelta {
    pub goal_id: Uuid,
    pub progress: f64,
    pub remaining: f64,
    pub eta_months: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRoiDelta {
    pub activity_id: Uuid,
    pub roi_ratio: Option<f64>,
    pub net_hours_per_occurrence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetricsDelta {
    pub object_id: Uuid,
    pub net_monthly_saving_hours: Option<f64>,
    pub payback_months: Option<f64>,
    pub lifetime_roi_hours: Option<f64>,
}

/// `scenario - baseline`, field by field, under the same names as [`AggregateResult`].
/// Hours stay absent unless both sides are known; per-entity deltas cover ids present
/// in both runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateDiff {
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
    pub goals_progress: Vec<GoalDelta>,
    pub activities_roi: Vec<ActivityRoiDelta>,
    pub objects_metrics: Vec<ObjectMetricsDelta>,
    pub forecast_net: Vec<Option<f64>>,
    pub forecast_labels: Vec<MonthKey>,
    /// Months the breakeven moved; positive means later.
    pub projected_breakeven_month: Option<i64>,
    pub income_by_source_money: BTreeMap<String, MoneySeries>,
    pub budget_variance_by_category_hours: CategoryHours,
}

impl AggregateDiff {
    pub fn between(baseline: &AggregateResult, scenario: &AggregateResult) -> Self {
        Self {
            income_money: money(&baseline.income_money, &scenario.income_money),
            income_hours: hours(&baseline.income_hours, &scenario.income_hours),
            expense_money: money(&baseline.expense_money, &scenario.expense_money),
            expense_hours: hours(&baseline.expense_hours, &scenario.expense_hours),
            objects_maint_hours: hours(
                &baseline.objects_maint_hours,
                &scenario.objects_maint_hours,
            ),
            objects_saved_hours: hours(
                &baseline.objects_saved_hours,
                &scenario.objects_saved_hours,
            ),
            objects_capex_hours: hours(
                &baseline.objects_capex_hours,
                &scenario.objects_capex_hours,
            ),
            activities_saved_hours: hours(
                &baseline.activities_saved_hours,
                &scenario.activities_saved_hours,
            ),
            activities_extra_cost_hours: hours(
                &baseline.activities_extra_cost_hours,
                &scenario.activities_extra_cost_hours,
            ),
            budget_money: money(&baseline.budget_money, &scenario.budget_money),
            budget_hours: hours(&baseline.budget_hours, &scenario.budget_hours),
            budget_variance_hours_by_month: hours(
                &baseline.budget_variance_hours_by_month,
                &scenario.budget_variance_hours_by_month,
            ),
            cost_by_category_hours: category_hours(
                &baseline.cost_by_category_hours,
                &scenario.cost_by_category_hours,
            ),
            savings_by_category_hours: category_hours(
                &baseline.savings_by_category_hours,
                &scenario.savings_by_category_hours,
            ),
            time_cost_hours: hours(&baseline.time_cost_hours, &scenario.time_cost_hours),
            time_savings_hours: hours(&baseline.time_savings_hours, &scenario.time_savings_hours),
            time_burn_net: hours(&baseline.time_burn_net, &scenario.time_burn_net),
            net_savings_hours_per_month: delta(
                baseline.net_savings_hours_per_month,
                scenario.net_savings_hours_per_month,
            ),
            goals_progress: goals(baseline, scenario),
            activities_roi: activities(baseline, scenario),
            objects_metrics: objects(baseline, scenario),
            forecast_net: baseline
                .forecast_net
                .iter()
                .zip(&scenario.forecast_net)
                .map(|(base, projected)| delta(*base, *projected))
                .collect(),
            forecast_labels: scenario.forecast_labels.clone(),
            projected_breakeven_month: match (
                baseline.projected_breakeven_month,
                scenario.projected_breakeven_month,
            ) {
                (Some(base), Some(projected)) => Some(projected.months_since(base)),
                _ => None,
            },
            income_by_source_money: category_money(
                &baseline.income_by_source_money,
                &scenario.income_by_source_money,
            ),
            budget_variance_by_category_hours: category_hours(
                &baseline.budget_variance_by_category_hours,
                &scenario.budget_variance_by_category_hours,
            ),
        }
    }

    /// True when no money or hours value moved.
    pub fn is_zero(&self) -> bool {
        let money_zero = |series: &MoneySeries| series.values().all(|value| *value == 0.0);
        let hours_zero =
            |series: &HoursSeries| series.values().flatten().all(|value| *value == 0.0);
        let categories_zero =
            |categories: &CategoryHours| categories.values().all(|series| hours_zero(series));

        [&self.income_money, &self.expense_money, &self.budget_money]
            .into_iter()
            .all(money_zero)
            && [
                &self.income_hours,
                &self.expense_hours,
                &self.objects_maint_hours,
                &self.objects_saved_hours,
                &self.objects_capex_hours,
                &self.activities_saved_hours,
                &self.activities_extra_cost_hours,
                &self.budget_hours,
                &self.budget_variance_hours_by_month,
                &self.time_cost_hours,
                &self.time_savings_hours,
                &self.time_burn_net,
            ]
            .into_iter()
            .all(hours_zero)
            && [
                &self.cost_by_category_hours,
                &self.savings_by_category_hours,
                &self.budget_variance_by_category_hours,
            ]
            .into_iter()
            .all(categories_zero)
            && self.income_by_source_money.values().all(money_zero)
            && self.net_savings_hours_per_month.unwrap_or(0.0) == 0.0
            && self.forecast_net.iter().flatten().all(|value| *value == 0.0)
            && self.projected_breakeven_month.unwrap_or(0) == 0
            && self.goals_progress.iter().all(|goal| {
                goal.progress == 0.0
                    && goal.remaining == 0.0
                    && goal.eta_months.unwrap_or(0.0) == 0.0
            })
            && self.activities_roi.iter().all(|activity| {
                activity.roi_ratio.unwrap_or(0.0) == 0.0
                    && activity.net_hours_per_occurrence.unwrap_or(0.0) == 0.0
            })
            && self.objects_metrics.iter().all(|object| {
                object.net_monthly_saving_hours.unwrap_or(0.0) == 0.0
                    && object.payback_months.unwrap_or(0.0) == 0.0
                    && object.lifetime_roi_hours.unwrap_or(0.0) == 0.0
            })
    }
}

/// Undefined only when both runs are; a missing side counts as zero.
fn delta(baseline: Option<f64>, scenario: Option<f64>) -> Option<f64> {
    match (baseline, scenario) {
        (None, None) => None,
        (base, projected) => Some(projected.unwrap_or(0.0) - base.unwrap_or(0.0)),
    }
}

fn money(baseline: &MoneySeries, scenario: &MoneySeries) -> MoneySeries {
    baseline
        .keys()
        .chain(scenario.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|month| {
            let base = baseline.get(month).copied().unwrap_or(0.0);
            let projected = scenario.get(month).copied().unwrap_or(0.0);
            (*month, round_units(projected - base))
        })
        .collect()
}

fn hours(baseline: &HoursSeries, scenario: &HoursSeries) -> HoursSeries {
    baseline
        .keys()
        .chain(scenario.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|month| {
            let base = baseline.get(month).copied().flatten();
            let projected = scenario.get(month).copied().flatten();
            (*month, delta(base, projected))
        })
        .collect()
}

/// Category maps differ in keys when a scenario adds or removes the last row of a
/// category; a missing series counts as zero in every month the other side knows.
fn category_hours(baseline: &CategoryHours, scenario: &CategoryHours) -> CategoryHours {
    keys(baseline, scenario)
        .map(|key| {
            let series = match (baseline.get(key), scenario.get(key)) {
                (Some(base), Some(projected)) => hours(base, projected),
                (Some(base), None) => hours(base, &zeroed(base)),
                (None, Some(projected)) => hours(&zeroed(projected), projected),
                (None, None) => HoursSeries::new(),
            };
            (key.clone(), series)
        })
        .collect()
}

fn category_money(
    baseline: &BTreeMap<String, MoneySeries>,
    scenario: &BTreeMap<String, MoneySeries>,
) -> BTreeMap<String, MoneySeries> {
    let empty = MoneySeries::new();
    keys(baseline, scenario)
        .map(|key| {
            let base = baseline.get(key).unwrap_or(&empty);
            let projected = scenario.get(key).unwrap_or(&empty);
            (key.clone(), money(base, projected))
        })
        .collect()
}

fn keys<'a, V>(
    left: &'a BTreeMap<String, V>,
    right: &'a BTreeMap<String, V>,
) -> impl Iterator<Item = &'a String> {
    left.keys()
        .chain(right.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
}

fn zeroed(series: &HoursSeries) -> HoursSeries {
    series
        .iter()
        .map(|(month, value)| (*month, value.map(|_| 0.0)))
        .collect()
}

/// Display money differences are rounded to the cent like the results they come from.
fn round_units(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn goals(baseline: &AggregateResult, scenario: &AggregateResult) -> Vec<GoalDelta> {
    scenario
        .goals_progress
        .iter()
        .filter_map(|projected| {
            let base = baseline.goal(projected.goal_id)?;
            Some(GoalDelta {
                goal_id: projected.goal_id,
                progress: projected.progress - base.progress,
                remaining: projected.remaining - base.remaining,
                eta_months: delta(base.eta_months, projected.eta_months),
            })
        })
        .collect()
}

fn activities(baseline: &AggregateResult, scenario: &AggregateResult) -> Vec<ActivityRoiDelta> {
    scenario
        .activities_roi
        .iter()
        .filter_map(|projected| {
            let base = baseline
                .activities_roi
                .iter()
                .find(|activity| activity.activity_id == projected.activity_id)?;
            Some(ActivityRoiDelta {
                activity_id: projected.activity_id,
                roi_ratio: delta(base.roi_ratio, projected.roi_ratio),
                net_hours_per_occurrence: delta(
                    base.net_hours_per_occurrence,
                    projected.net_hours_per_occurrence,
                ),
            })
        })
        .collect()
}

fn objects(baseline: &AggregateResult, scenario: &AggregateResult) -> Vec<ObjectMetricsDelta> {
    scenario
        .objects_metrics
        .iter()
        .filter_map(|projected| {
            let base = baseline.object(projected.object_id)?;
            Some(ObjectMetricsDelta {
                object_id: projected.object_id,
                net_monthly_saving_hours: delta(
                    base.net_monthly_saving_hours,
                    projected.net_monthly_saving_hours,
                ),
                payback_months: delta(base.payback_months, projected.payback_months),
                lifetime_roi_hours: delta(base.lifetime_roi_hours, projected.lifetime_roi_hours),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> MonthKey {
        raw.parse().unwrap()
    }

    #[test]
    fn identical_results_diff_to_zero() {
        let mut result = AggregateResult::default();
        result.expense_money.insert(key("2025-08"), 59.99);
        result.time_burn_net.insert(key("2025-08"), Some(3.0));
        result.time_burn_net.insert(key("2025-09"), None);
        let diff = AggregateDiff::between(&result, &result);
        assert!(diff.is_zero());
        assert_eq!(diff.time_burn_net[&key("2025-09")], None);
    }

    #[test]
    fn hours_undefined_only_when_both_sides_are() {
        let baseline = HoursSeries::from([
            (key("2025-08"), Some(1.0)),
            (key("2025-09"), None),
            (key("2025-10"), Some(4.0)),
            (key("2025-11"), None),
        ]);
        let scenario = HoursSeries::from([
            (key("2025-08"), Some(3.5)),
            (key("2025-09"), Some(2.0)),
            (key("2025-10"), None),
            (key("2025-11"), None),
        ]);
        let diff = hours(&baseline, &scenario);
        assert_eq!(diff[&key("2025-08")], Some(2.5));
        assert_eq!(diff[&key("2025-09")], Some(2.0));
        assert_eq!(diff[&key("2025-10")], Some(-4.0));
        assert_eq!(diff[&key("2025-11")], None);
    }

    #[test]
    fn new_category_diffs_against_zero() {
        let scenario = CategoryHours::from([(
            "food".to_string(),
            HoursSeries::from([(key("2025-08"), Some(2.0)), (key("2025-09"), None)]),
        )]);
        let diff = category_hours(&CategoryHours::new(), &scenario);
        assert_eq!(diff["food"][&key("2025-08")], Some(2.0));
        assert_eq!(diff["food"][&key("2025-09")], None);
    }

    #[test]
    fn breakeven_shift_in_months() {
        let mut baseline = AggregateResult::default();
        baseline.projected_breakeven_month = Some(key("2025-11"));
        let mut scenario = AggregateResult::default();
        scenario.projected_breakeven_month = Some(key("2025-09"));
        assert_eq!(
            AggregateDiff::between(&baseline, &scenario).projected_breakeven_month,
            Some(-2)
        );
    }
}
