use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timeledger_domain::{Activity, Goal, GoalContribution, GoalTargetType, MonthKey, Object};
use uuid::Uuid;

use crate::calendar::MonthGrid;
use crate::core::context::EngineContext;
use crate::core::series::to_units;

use super::conversion::{ConversionService, Diagnostics};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Reached,
    InProgress,
    /// No positive net saving pace to project from.
    Blocked,
    /// A money goal cannot be expressed in hours without a rate.
    NeedsHourlyRate,
}

/// Goal progress; money goals report amounts in base-currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: Uuid,
    pub name: String,
    pub target_type: GoalTargetType,
    pub target: f64,
    pub progress: f64,
    pub remaining: f64,
    pub remaining_hours: Option<f64>,
    pub eta_months: Option<f64>,
    pub status: GoalStatus,
    pub projected_completion: Option<MonthKey>,
    pub target_date: Option<NaiveDate>,
    pub on_track: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRoi {
    pub activity_id: Uuid,
    pub name: String,
    pub cost_hours_per_occurrence: Option<f64>,
    pub saved_hours_per_occurrence: f64,
    pub roi_ratio: Option<f64>,
    pub net_hours_per_occurrence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetrics {
    pub object_id: Uuid,
    pub name: String,
    pub price_hours: Option<f64>,
    pub maintenance_hours_per_month: Option<f64>,
    pub hours_saved_per_month: f64,
    pub net_monthly_saving_hours: Option<f64>,
    pub payback_months: Option<f64>,
    pub lifetime_roi_hours: Option<f64>,
    pub months_owned: i64,
    pub breakeven_reached: bool,
}

/// Point-in-time metrics derived from the aggregated series. Every money-to-hours
/// conversion here uses `rate`, the rate of the last grid month.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn activities_roi(
        activities: &[Activity],
        ctx: &EngineContext,
        grid: &MonthGrid,
        rate: Option<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ActivityRoi> {
        activities
            .iter()
            .map(|activity| {
                let direct_hours = if activity.direct_cost_cents == 0 {
                    Some(0.0)
                } else {
                    let cents = ConversionService::to_base(
                        ctx,
                        activity.direct_cost_cents as f64,
                        &activity.currency,
                        analytics_date(grid),
                        diagnostics,
                    );
                    ConversionService::to_hours(cents, rate)
                };
                let cost = direct_hours.map(|hours| hours + activity.duration_hours());
                let saved = activity.saved_hours_per_occurrence();
                ActivityRoi {
                    activity_id: activity.id,
                    name: activity.name.clone(),
                    cost_hours_per_occurrence: cost,
                    saved_hours_per_occurrence: saved,
                    roi_ratio: cost.filter(|cost| *cost > 0.0).map(|cost| saved / cost),
                    net_hours_per_occurrence: cost.map(|cost| saved - cost),
                }
            })
            .collect()
    }

    pub fn objects_metrics(
        objects: &[Object],
        ctx: &EngineContext,
        grid: &MonthGrid,
        rate: Option<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ObjectMetrics> {
        objects
            .iter()
            .map(|object| {
                let price = ConversionService::to_base(
                    ctx,
                    object.price_cents as f64,
                    &object.currency,
                    object.purchase_date,
                    diagnostics,
                );
                let maintenance = if object.maintenance_cents_per_month == 0 {
                    0.0
                } else {
                    ConversionService::to_base(
                        ctx,
                        object.maintenance_cents_per_month as f64,
                        &object.currency,
                        object_valuation_date(object, grid),
                        diagnostics,
                    )
                };
                let price_hours = ConversionService::to_hours(price, rate);
                let maintenance_hours = ConversionService::to_hours(maintenance, rate);
                let saved = object.hours_saved_per_month;
                let net = maintenance_hours.map(|maintenance| saved - maintenance);
                let payback = match (price_hours, net) {
                    (Some(price), Some(net)) if net > 0.0 => Some(price / net),
                    _ => None,
                };
                let life = object.expected_life_months as f64;
                let lifetime = match (price_hours, maintenance_hours) {
                    (Some(price), Some(maintenance)) if object.expected_life_months > 0 => {
                        Some(saved * life - price - maintenance * life)
                    }
                    _ => None,
                };
                let months_owned = (grid.last().months_since(object.purchase_month()) + 1).max(0);
                ObjectMetrics {
                    object_id: object.id,
                    name: object.name.clone(),
                    price_hours,
                    maintenance_hours_per_month: maintenance_hours,
                    hours_saved_per_month: saved,
                    net_monthly_saving_hours: net,
                    payback_months: payback,
                    lifetime_roi_hours: lifetime,
                    months_owned,
                    breakeven_reached: payback
                        .is_some_and(|payback| months_owned as f64 >= payback),
                }
            })
            .collect()
    }

    /// Progress counts contributions dated up to the end of the grid.
    pub fn goals_progress(
        goals: &[Goal],
        contributions: &[GoalContribution],
        ctx: &EngineContext,
        grid: &MonthGrid,
        rate: Option<f64>,
        net_savings_hours_per_month: Option<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<GoalProgress> {
        let window_end = grid.end_date();
        goals
            .iter()
            .map(|goal| {
                let relevant = contributions.iter().filter(|contribution| {
                    contribution.goal_id == goal.id && contribution.date <= window_end
                });
                let progress: f64 = match goal.target_type {
                    GoalTargetType::Hours => {
                        relevant.filter_map(|contribution| contribution.hours).sum()
                    }
                    GoalTargetType::Money => relevant
                        .filter_map(|contribution| {
                            let cents = contribution.amount_cents?;
                            Some(ConversionService::to_base(
                                ctx,
                                cents as f64,
                                &contribution.currency,
                                contribution.date,
                                diagnostics,
                            ))
                        })
                        .sum(),
                };
                let remaining = (goal.target - progress).max(0.0);
                let remaining_hours = match goal.target_type {
                    GoalTargetType::Hours => Some(remaining),
                    GoalTargetType::Money => ConversionService::to_hours(remaining, rate),
                };
                let pace = net_savings_hours_per_month.filter(|pace| *pace > 0.0);

                let (status, eta_months) = if remaining <= 0.0 {
                    (GoalStatus::Reached, Some(0.0))
                } else {
                    match (remaining_hours, pace) {
                        (None, _) => (GoalStatus::NeedsHourlyRate, None),
                        (Some(_), None) => (GoalStatus::Blocked, None),
                        (Some(hours), Some(pace)) => (GoalStatus::InProgress, Some(hours / pace)),
                    }
                };
                let projected_completion = eta_months
                    .map(|eta| grid.last().add_months(eta.ceil() as i64));
                let on_track = goal.target_date.map(|deadline| {
                    status == GoalStatus::Reached
                        || projected_completion
                            .is_some_and(|completion| completion <= MonthKey::from_date(deadline))
                });

                let (target, progress, remaining) = match goal.target_type {
                    GoalTargetType::Hours => (goal.target, progress, remaining),
                    GoalTargetType::Money => {
                        (to_units(goal.target), to_units(progress), to_units(remaining))
                    }
                };
                GoalProgress {
                    goal_id: goal.id,
                    name: goal.name.clone(),
                    target_type: goal.target_type,
                    target,
                    progress,
                    remaining,
                    remaining_hours,
                    eta_months,
                    status,
                    projected_completion,
                    target_date: goal.target_date,
                    on_track,
                }
            })
            .collect()
    }
}

/// Day on which per-occurrence activity costs are priced.
pub(crate) fn analytics_date(grid: &MonthGrid) -> NaiveDate {
    grid.last().first_day()
}

/// Day on which an object's maintenance is priced for its metrics.
pub(crate) fn object_valuation_date(object: &Object, grid: &MonthGrid) -> NaiveDate {
    analytics_date(grid).max(object.purchase_date)
}
