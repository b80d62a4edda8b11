//! Month-indexed series and the arithmetic shared by the services.
//!
//! Money series are kept in base-currency minor units until the result boundary.
//! Hours series hold `None` for months without a known hourly rate.

use std::collections::BTreeMap;

use timeledger_domain::MonthKey;

use crate::calendar::MonthGrid;
use crate::rates::MonthlyRates;

pub type MoneySeries = BTreeMap<MonthKey, f64>;
pub type HoursSeries = BTreeMap<MonthKey, Option<f64>>;
pub type CategoryMoney = BTreeMap<String, MoneySeries>;
pub type CategoryHours = BTreeMap<String, HoursSeries>;

pub fn zero_money(grid: &MonthGrid) -> MoneySeries {
    grid.iter().map(|month| (month, 0.0)).collect()
}

/// Zero where a rate exists, absent elsewhere.
pub fn zero_hours(grid: &MonthGrid, rates: &MonthlyRates) -> HoursSeries {
    grid.iter()
        .map(|month| (month, rate_at(rates, month).map(|_| 0.0)))
        .collect()
}

pub fn rate_at(rates: &MonthlyRates, month: MonthKey) -> Option<f64> {
    rates.get(&month).copied().flatten()
}

/// Adds `amount` to `month` if the month belongs to the series.
pub fn add_money(series: &mut MoneySeries, month: MonthKey, amount: f64) {
    if let Some(slot) = series.get_mut(&month) {
        *slot += amount;
    }
}

pub fn add_category_money(
    categories: &mut CategoryMoney,
    grid: &MonthGrid,
    key: &str,
    month: MonthKey,
    amount: f64,
) {
    if !grid.contains(month) {
        return;
    }
    let series = categories
        .entry(key.to_string())
        .or_insert_with(|| zero_money(grid));
    add_money(series, month, amount);
}

/// Divides each month by its rate.
pub fn money_to_hours(money: &MoneySeries, rates: &MonthlyRates) -> HoursSeries {
    money
        .iter()
        .map(|(month, cents)| (*month, rate_at(rates, *month).map(|rate| cents / rate)))
        .collect()
}

pub fn category_money_to_hours(categories: &CategoryMoney, rates: &MonthlyRates) -> CategoryHours {
    categories
        .iter()
        .map(|(key, series)| (key.clone(), money_to_hours(series, rates)))
        .collect()
}

/// Month-wise sum; absent in any input makes the month absent.
pub fn sum_hours(grid: &MonthGrid, parts: &[&HoursSeries]) -> HoursSeries {
    grid.iter()
        .map(|month| {
            let total = parts.iter().try_fold(0.0, |acc, part| {
                part.get(&month).copied().flatten().map(|value| acc + value)
            });
            (month, total)
        })
        .collect()
}

pub fn subtract_hours(grid: &MonthGrid, left: &HoursSeries, right: &HoursSeries) -> HoursSeries {
    grid.iter()
        .map(|month| {
            let left = left.get(&month).copied().flatten();
            let right = right.get(&month).copied().flatten();
            let value = match (left, right) {
                (Some(l), Some(r)) => Some(l - r),
                _ => None,
            };
            (month, value)
        })
        .collect()
}

/// Month-wise sum of category series into one series.
pub fn sum_categories(grid: &MonthGrid, categories: &CategoryMoney) -> MoneySeries {
    let mut total = zero_money(grid);
    for series in categories.values() {
        for (month, amount) in series {
            add_money(&mut total, *month, *amount);
        }
    }
    total
}

/// Merges several category maps key by key.
pub fn merge_categories(grid: &MonthGrid, sources: &[&CategoryMoney]) -> CategoryMoney {
    let mut merged = CategoryMoney::new();
    for source in sources {
        for (key, series) in source.iter() {
            for (month, amount) in series {
                add_category_money(&mut merged, grid, key, *month, *amount);
            }
        }
    }
    merged
}

/// Minor units to display units, rounded to the cent.
pub fn to_units(cents: f64) -> f64 {
    (cents.round()) / 100.0
}

pub fn money_to_units(series: &MoneySeries) -> MoneySeries {
    series
        .iter()
        .map(|(month, cents)| (*month, to_units(*cents)))
        .collect()
}

pub fn category_money_to_units(categories: &CategoryMoney) -> BTreeMap<String, MoneySeries> {
    categories
        .iter()
        .map(|(key, series)| (key.clone(), money_to_units(series)))
        .collect()
}
