use timeledger_domain::BudgetAllocation;

use crate::calendar::MonthGrid;
use crate::core::context::EngineContext;
use crate::core::series::{
    add_category_money, category_money_to_hours, money_to_hours, rate_at, sum_categories,
    CategoryHours, CategoryMoney, HoursSeries, MoneySeries,
};
use crate::rates::MonthlyRates;

use super::conversion::{ConversionService, Diagnostics};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetAggregate {
    pub budget_money: MoneySeries,
    pub budget_hours: HoursSeries,
    pub budget_by_category_money: CategoryMoney,
    pub variance_hours_by_month: HoursSeries,
    pub variance_by_category_hours: CategoryHours,
}

pub struct BudgetService;

impl BudgetService {
    /// Budget vs. realized spend in hours. Positive variance means under budget.
    ///
    /// Only allocated categories produce variance; spend in categories without an
    /// allocation has nothing to compare against and is left out.
    pub fn variance(
        allocations: &[BudgetAllocation],
        actual_by_category: &CategoryHours,
        ctx: &EngineContext,
        grid: &MonthGrid,
        rates: &MonthlyRates,
        diagnostics: &mut Diagnostics,
    ) -> BudgetAggregate {
        let budget_by_category = Self::allocate(allocations, ctx, grid, diagnostics);
        let budget_money = sum_categories(grid, &budget_by_category);
        let budget_hours = money_to_hours(&budget_money, rates);
        let budget_by_category_hours = category_money_to_hours(&budget_by_category, rates);

        let mut variance_by_category = CategoryHours::new();
        for (category, budget) in &budget_by_category_hours {
            let actual = actual_by_category.get(category);
            let variance = grid
                .iter()
                .map(|month| {
                    let value = budget.get(&month).copied().flatten().and_then(|budget| {
                        let spent = match actual {
                            Some(series) => series.get(&month).copied().flatten()?,
                            None => 0.0,
                        };
                        Some(budget - spent)
                    });
                    (month, value)
                })
                .collect();
            variance_by_category.insert(category.clone(), variance);
        }

        let variance_hours_by_month = grid
            .iter()
            .map(|month| {
                let total = rate_at(rates, month).and_then(|_| {
                    variance_by_category.values().try_fold(0.0, |acc, series| {
                        series.get(&month).copied().flatten().map(|value| acc + value)
                    })
                });
                (month, total)
            })
            .collect();

        BudgetAggregate {
            budget_money,
            budget_hours,
            budget_by_category_money: budget_by_category,
            variance_hours_by_month,
            variance_by_category_hours: variance_by_category,
        }
    }

    /// Spreads each allocation evenly over the months its period covers, priced at the
    /// period start, and keeps the months that fall inside the grid.
    pub fn allocate(
        allocations: &[BudgetAllocation],
        ctx: &EngineContext,
        grid: &MonthGrid,
        diagnostics: &mut Diagnostics,
    ) -> CategoryMoney {
        let mut by_category = CategoryMoney::new();
        for allocation in allocations {
            let first = allocation.first_month();
            let last = allocation.last_month().max(first);
            if last < grid.first() || first > grid.last() {
                continue;
            }
            let amount = ConversionService::to_base(
                ctx,
                allocation.amount_cents as f64,
                &allocation.currency,
                allocation.period_start,
                diagnostics,
            );
            let span = (last.months_since(first) + 1) as i32;
            let key = allocation.category_id.to_string();
            for (month, part) in ConversionService::amortize(amount, first, span) {
                add_category_money(&mut by_category, grid, &key, month, part);
            }
        }
        by_category
    }
}
