//! Gathers every FX lookup a pipeline run will make, so the provider can answer them
//! in one batch before any aggregation starts.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use timeledger_domain::{CurrencyCode, RowSet};

use crate::calendar::MonthGrid;
use crate::core::context::EngineContext;
use crate::core::services::aggregation_service::{
    activity_dates, expense_dates, income_dates, maintenance_date,
};
use crate::core::services::analytics_service::{analytics_date, object_valuation_date};
use crate::currency::{collect_keys, FxKey};

/// Keys for every conversion `TimeValueEngine::run` performs over `rows`. Row sets
/// are unioned, so one fetch serves both sides of a scenario comparison.
pub fn fx_keys<'a>(
    row_sets: impl IntoIterator<Item = &'a RowSet>,
    ctx: &EngineContext,
    grid: &MonthGrid,
) -> BTreeSet<FxKey> {
    let mut conversions: Vec<(&CurrencyCode, NaiveDate)> = Vec::new();
    for rows in row_sets {
        conversions.extend(conversions_for(rows, ctx, grid));
    }
    collect_keys(ctx.anchor_currency(), &ctx.base_currency, conversions)
}

fn conversions_for<'a>(
    rows: &'a RowSet,
    ctx: &EngineContext,
    grid: &MonthGrid,
) -> Vec<(&'a CurrencyCode, NaiveDate)> {
    let mut out = Vec::new();
    for income in &rows.incomes {
        let dates = income_dates(income, grid, ctx);
        out.extend(dates.into_iter().map(|date| (&income.currency, date)));
    }
    for expense in &rows.expenses {
        let dates = expense_dates(expense, grid, ctx);
        out.extend(dates.into_iter().map(|date| (&expense.currency, date)));
    }
    for object in &rows.objects {
        out.push((&object.currency, object.purchase_date));
        if object.maintenance_cents_per_month != 0 {
            out.extend(
                grid.iter()
                    .filter(|month| object.in_service(*month))
                    .map(|month| (&object.currency, maintenance_date(object, month))),
            );
            out.push((&object.currency, object_valuation_date(object, grid)));
        }
    }
    for activity in &rows.activities {
        if activity.direct_cost_cents == 0 {
            continue;
        }
        let dates = activity_dates(activity, grid, ctx);
        out.extend(dates.into_iter().map(|date| (&activity.currency, date)));
        out.push((&activity.currency, analytics_date(grid)));
    }
    for allocation in &rows.budget_allocations {
        if allocation.last_month() >= grid.first() && allocation.first_month() <= grid.last() {
            out.push((&allocation.currency, allocation.period_start));
        }
    }
    let window_end = grid.end_date();
    for contribution in &rows.goal_contributions {
        if contribution.amount_cents.is_some() && contribution.date <= window_end {
            out.push((&contribution.currency, contribution.date));
        }
    }
    out
}
