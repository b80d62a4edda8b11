use chrono::NaiveDate;
use timeledger_domain::{
    category_key, Activity, Expense, Frequency, Income, MonthKey, Object, RowSet,
};

use crate::calendar::{MonthGrid, RecurrenceRule};
use crate::core::context::EngineContext;
use crate::core::series::{
    add_category_money, add_money, category_money_to_hours, merge_categories, money_to_hours,
    rate_at, subtract_hours, sum_hours, zero_hours, zero_money, CategoryHours, CategoryMoney,
    HoursSeries, MoneySeries,
};
use crate::rates::MonthlyRates;

use super::conversion::{ConversionService, Diagnostics};

/// Label for income rows without a source.
pub const UNSPECIFIED_SOURCE: &str = "unspecified";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomeAggregate {
    pub money: MoneySeries,
    pub by_source: CategoryMoney,
}

/// Per-month spending and savings, money in minor units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpendingAggregate {
    pub expense_money: MoneySeries,
    pub expense_hours: HoursSeries,
    pub objects_maint_money: MoneySeries,
    pub objects_maint_hours: HoursSeries,
    pub objects_capex_money: MoneySeries,
    pub objects_capex_hours: HoursSeries,
    pub objects_saved_hours: HoursSeries,
    pub activities_cost_money: MoneySeries,
    pub activities_extra_cost_hours: HoursSeries,
    pub activities_saved_hours: HoursSeries,
    pub cost_by_category_money: CategoryMoney,
    pub cost_by_category_hours: CategoryHours,
    pub savings_by_category_hours: CategoryHours,
    pub time_cost_hours: HoursSeries,
    pub time_savings_hours: HoursSeries,
    pub time_burn_net: HoursSeries,
    pub net_savings_hours_per_month: Option<f64>,
}

/// Money accumulated per month and per category for one entity type.
struct Bucket {
    total: MoneySeries,
    by_category: CategoryMoney,
}

impl Bucket {
    fn new(grid: &MonthGrid) -> Self {
        Self {
            total: zero_money(grid),
            by_category: CategoryMoney::new(),
        }
    }

    fn add(&mut self, grid: &MonthGrid, category: &str, month: MonthKey, amount: f64) {
        add_money(&mut self.total, month, amount);
        add_category_money(&mut self.by_category, grid, category, month, amount);
    }
}

pub struct AggregationService;

impl AggregationService {
    /// Income per month and per source, in base-currency minor units.
    pub fn income(
        rows: &RowSet,
        ctx: &EngineContext,
        grid: &MonthGrid,
        diagnostics: &mut Diagnostics,
    ) -> IncomeAggregate {
        let mut bucket = Bucket::new(grid);
        for income in &rows.incomes {
            let source = income
                .source
                .as_deref()
                .map(str::trim)
                .filter(|source| !source.is_empty())
                .unwrap_or(UNSPECIFIED_SOURCE);
            for date in income_dates(income, grid, ctx) {
                let amount = ConversionService::to_base(
                    ctx,
                    income.amount_cents as f64,
                    &income.currency,
                    date,
                    diagnostics,
                );
                bucket.add(grid, source, MonthKey::from_date(date), amount);
            }
        }
        IncomeAggregate {
            money: bucket.total,
            by_source: bucket.by_category,
        }
    }

    /// Expenses, objects and activities combined into the cost, savings and burn series.
    pub fn spending(
        rows: &RowSet,
        ctx: &EngineContext,
        grid: &MonthGrid,
        rates: &MonthlyRates,
        diagnostics: &mut Diagnostics,
    ) -> SpendingAggregate {
        let expenses = Self::expenses(&rows.expenses, ctx, grid, diagnostics);
        let (maintenance, capex) = Self::object_costs(&rows.objects, ctx, grid, diagnostics);
        let activity_costs = Self::activity_costs(&rows.activities, ctx, grid, diagnostics);

        let mut savings_by_category = CategoryHours::new();
        let objects_saved_hours =
            Self::object_savings(&rows.objects, grid, rates, &mut savings_by_category);
        let activities_saved_hours =
            Self::activity_savings(&rows.activities, ctx, grid, rates, &mut savings_by_category);

        let expense_hours = money_to_hours(&expenses.total, rates);
        let objects_maint_hours = money_to_hours(&maintenance.total, rates);
        let objects_capex_hours = money_to_hours(&capex.total, rates);
        let activities_extra_cost_hours = money_to_hours(&activity_costs.total, rates);

        let cost_by_category_money = merge_categories(
            grid,
            &[
                &expenses.by_category,
                &maintenance.by_category,
                &capex.by_category,
                &activity_costs.by_category,
            ],
        );
        let cost_by_category_hours = category_money_to_hours(&cost_by_category_money, rates);

        let time_cost_hours = sum_hours(
            grid,
            &[
                &expense_hours,
                &objects_maint_hours,
                &activities_extra_cost_hours,
                &objects_capex_hours,
            ],
        );
        let time_savings_hours = sum_hours(grid, &[&objects_saved_hours, &activities_saved_hours]);
        let time_burn_net = subtract_hours(grid, &time_cost_hours, &time_savings_hours);
        let net_savings_hours_per_month = mean_net_savings(&time_burn_net);

        SpendingAggregate {
            expense_money: expenses.total,
            expense_hours,
            objects_maint_money: maintenance.total,
            objects_maint_hours,
            objects_capex_money: capex.total,
            objects_capex_hours,
            objects_saved_hours,
            activities_cost_money: activity_costs.total,
            activities_extra_cost_hours,
            activities_saved_hours,
            cost_by_category_money,
            cost_by_category_hours,
            savings_by_category_hours: savings_by_category,
            time_cost_hours,
            time_savings_hours,
            time_burn_net,
            net_savings_hours_per_month,
        }
    }

    fn expenses(
        expenses: &[Expense],
        ctx: &EngineContext,
        grid: &MonthGrid,
        diagnostics: &mut Diagnostics,
    ) -> Bucket {
        let mut bucket = Bucket::new(grid);
        for expense in expenses {
            let category = category_key(expense.category_id);
            for date in expense_dates(expense, grid, ctx) {
                let amount = ConversionService::to_base(
                    ctx,
                    expense.amount_cents as f64,
                    &expense.currency,
                    date,
                    diagnostics,
                );
                let month = MonthKey::from_date(date);
                if expense.frequency == Frequency::Once {
                    for (slot, part) in ConversionService::amortize_one_time(ctx, amount, month) {
                        bucket.add(grid, &category, slot, part);
                    }
                } else {
                    bucket.add(grid, &category, month, amount);
                }
            }
        }
        bucket
    }

    /// Maintenance and capex buckets for all objects.
    fn object_costs(
        objects: &[Object],
        ctx: &EngineContext,
        grid: &MonthGrid,
        diagnostics: &mut Diagnostics,
    ) -> (Bucket, Bucket) {
        let mut maintenance = Bucket::new(grid);
        let mut capex = Bucket::new(grid);
        for object in objects {
            let category = category_key(object.category_id);
            let purchase = object.purchase_month();

            if object.price_cents != 0 {
                let price = ConversionService::to_base(
                    ctx,
                    object.price_cents as f64,
                    &object.currency,
                    object.purchase_date,
                    diagnostics,
                );
                for (month, part) in ConversionService::amortize_capex(ctx, price, purchase) {
                    capex.add(grid, &category, month, part);
                }
            }

            if object.maintenance_cents_per_month != 0 {
                for month in grid.iter().filter(|month| object.in_service(*month)) {
                    let amount = ConversionService::to_base(
                        ctx,
                        object.maintenance_cents_per_month as f64,
                        &object.currency,
                        maintenance_date(object, month),
                        diagnostics,
                    );
                    maintenance.add(grid, &category, month, amount);
                }
            }
        }
        (maintenance, capex)
    }

    fn object_savings(
        objects: &[Object],
        grid: &MonthGrid,
        rates: &MonthlyRates,
        by_category: &mut CategoryHours,
    ) -> HoursSeries {
        let mut total = zero_hours(grid, rates);
        for object in objects {
            if object.hours_saved_per_month == 0.0 {
                continue;
            }
            let purchase = object.purchase_month();
            let category = category_key(object.category_id);
            for month in grid.iter().filter(|month| *month >= purchase) {
                add_hours(&mut total, month, object.hours_saved_per_month);
                add_category_hours(
                    by_category,
                    grid,
                    rates,
                    &category,
                    month,
                    object.hours_saved_per_month,
                );
            }
        }
        total
    }

    fn activity_costs(
        activities: &[Activity],
        ctx: &EngineContext,
        grid: &MonthGrid,
        diagnostics: &mut Diagnostics,
    ) -> Bucket {
        let mut bucket = Bucket::new(grid);
        for activity in activities.iter().filter(|activity| activity.direct_cost_cents != 0) {
            let category = category_key(activity.category_id);
            for date in activity_dates(activity, grid, ctx) {
                let amount = ConversionService::to_base(
                    ctx,
                    activity.direct_cost_cents as f64,
                    &activity.currency,
                    date,
                    diagnostics,
                );
                bucket.add(grid, &category, MonthKey::from_date(date), amount);
            }
        }
        bucket
    }

    fn activity_savings(
        activities: &[Activity],
        ctx: &EngineContext,
        grid: &MonthGrid,
        rates: &MonthlyRates,
        by_category: &mut CategoryHours,
    ) -> HoursSeries {
        let mut total = zero_hours(grid, rates);
        for activity in activities.iter().filter(|activity| activity.saved_minutes > 0) {
            let category = category_key(activity.category_id);
            let saved = activity.saved_hours_per_occurrence();
            for date in activity_dates(activity, grid, ctx) {
                let month = MonthKey::from_date(date);
                add_hours(&mut total, month, saved);
                add_category_hours(by_category, grid, rates, &category, month, saved);
            }
        }
        total
    }
}

/// Income occurrence dates inside the grid. Recurring income repeats monthly.
pub(crate) fn income_dates(
    income: &Income,
    grid: &MonthGrid,
    ctx: &EngineContext,
) -> Vec<NaiveDate> {
    RecurrenceRule::new(income.frequency(), income.received_at).occurrences_in(grid, ctx.as_of)
}

/// Expense occurrence dates that reach the grid. One-time expenses dated shortly before
/// the grid are included when their amortization spills into it.
pub(crate) fn expense_dates(
    expense: &Expense,
    grid: &MonthGrid,
    ctx: &EngineContext,
) -> Vec<NaiveDate> {
    let rule = RecurrenceRule::new(expense.frequency, expense.start_date)
        .until(expense.end_date)
        .active(expense.is_active);
    if expense.frequency == Frequency::Once {
        let spill = (ctx.one_time_amortization_months.max(1) - 1) as i64;
        let lower = grid.first().add_months(-spill).first_day();
        rule.occurrences_between(lower, grid.end_date())
    } else {
        rule.occurrences_in(grid, ctx.as_of)
    }
}

/// Activity occurrences; a missing start date means the start of the grid.
pub(crate) fn activity_dates(
    activity: &Activity,
    grid: &MonthGrid,
    ctx: &EngineContext,
) -> Vec<NaiveDate> {
    let start = activity.start_date.unwrap_or_else(|| grid.start_date());
    RecurrenceRule::new(activity.frequency, start)
        .until(activity.end_date)
        .active(activity.is_active)
        .occurrences_in(grid, ctx.as_of)
}

/// Day whose FX rate prices an object's maintenance for `month`.
pub(crate) fn maintenance_date(object: &Object, month: MonthKey) -> NaiveDate {
    month.first_day().max(object.purchase_date)
}

fn add_hours(series: &mut HoursSeries, month: MonthKey, hours: f64) {
    if let Some(Some(slot)) = series.get_mut(&month) {
        *slot += hours;
    }
}

fn add_category_hours(
    categories: &mut CategoryHours,
    grid: &MonthGrid,
    rates: &MonthlyRates,
    key: &str,
    month: MonthKey,
    hours: f64,
) {
    if !grid.contains(month) || rate_at(rates, month).is_none() {
        return;
    }
    let series = categories
        .entry(key.to_string())
        .or_insert_with(|| zero_hours(grid, rates));
    add_hours(series, month, hours);
}

/// Mean of `-burn` over the months whose burn is known.
fn mean_net_savings(burn: &HoursSeries) -> Option<f64> {
    let known: Vec<f64> = burn.values().flatten().copied().collect();
    if known.is_empty() {
        return None;
    }
    Some(-known.iter().sum::<f64>() / known.len() as f64)
}
