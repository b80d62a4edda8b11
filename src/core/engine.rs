use timeledger_domain::RowSet;
use tracing::{debug, info};

use crate::calendar::MonthGrid;
use crate::core::context::EngineContext;
use crate::core::result::AggregateResult;
use crate::core::series::{
    category_money_to_units, money_to_hours, money_to_units, rate_at,
};
use crate::core::services::{
    AggregationService, AnalyticsService, BudgetService, Diagnostics, ForecastService,
};

/// Runs the full pipeline (aggregation, budget variance, analytics, forecast) over a
/// row set. The run is pure: the same rows, context and grid always give the same result.
pub struct TimeValueEngine;

impl TimeValueEngine {
    pub fn run(rows: &RowSet, ctx: &EngineContext, grid: &MonthGrid) -> AggregateResult {
        info!(
            from = %grid.first(),
            to = %grid.last(),
            rows = rows.row_count(),
            "running time-value pipeline"
        );
        let mut diagnostics = Diagnostics::new();

        let income = AggregationService::income(rows, ctx, grid, &mut diagnostics);
        let implied = ctx
            .implied_salary
            .then_some((&income.money, ctx.work_hours_per_month));
        let rates = ctx.rates.resolve(grid, implied);

        let spending = AggregationService::spending(rows, ctx, grid, &rates, &mut diagnostics);
        let budget = BudgetService::variance(
            &rows.budget_allocations,
            &spending.cost_by_category_hours,
            ctx,
            grid,
            &rates,
            &mut diagnostics,
        );

        let rate = rate_at(&rates, grid.last());
        let goals_progress = AnalyticsService::goals_progress(
            &rows.goals,
            &rows.goal_contributions,
            ctx,
            grid,
            rate,
            spending.net_savings_hours_per_month,
            &mut diagnostics,
        );
        let activities_roi =
            AnalyticsService::activities_roi(&rows.activities, ctx, grid, rate, &mut diagnostics);
        let objects_metrics =
            AnalyticsService::objects_metrics(&rows.objects, ctx, grid, rate, &mut diagnostics);

        let forecast = ForecastService::project(grid, &spending.time_burn_net, ctx.forecast);

        let warnings = diagnostics.into_warnings();
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "pipeline finished with degraded conversions");
        }

        AggregateResult {
            income_money: money_to_units(&income.money),
            income_hours: money_to_hours(&income.money, &rates),
            expense_money: money_to_units(&spending.expense_money),
            expense_hours: spending.expense_hours,
            objects_maint_hours: spending.objects_maint_hours,
            objects_saved_hours: spending.objects_saved_hours,
            objects_capex_hours: spending.objects_capex_hours,
            activities_saved_hours: spending.activities_saved_hours,
            activities_extra_cost_hours: spending.activities_extra_cost_hours,
            budget_money: money_to_units(&budget.budget_money),
            budget_hours: budget.budget_hours,
            budget_variance_hours_by_month: budget.variance_hours_by_month,
            cost_by_category_hours: spending.cost_by_category_hours,
            savings_by_category_hours: spending.savings_by_category_hours,
            time_cost_hours: spending.time_cost_hours,
            time_savings_hours: spending.time_savings_hours,
            time_burn_net: spending.time_burn_net,
            net_savings_hours_per_month: spending.net_savings_hours_per_month,
            goals_progress,
            activities_roi,
            objects_metrics,
            forecast_net: forecast.net,
            forecast_labels: forecast.labels,
            projected_breakeven_month: forecast.projected_breakeven_month,
            income_by_source_money: category_money_to_units(&income.by_source),
            budget_variance_by_category_hours: budget.variance_by_category_hours,
            warnings,
        }
    }
}
