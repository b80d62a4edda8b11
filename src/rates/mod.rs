//! Per-month hourly rate resolution.

use std::collections::BTreeMap;

use timeledger_domain::{HourlyRateEntry, MonthKey};

use crate::calendar::MonthGrid;

/// Rate per grid month in base-currency minor units per hour; `None` when unknown.
pub type MonthlyRates = BTreeMap<MonthKey, Option<f64>>;

/// Step function over a user's rate history with optional per-month overrides.
///
/// Precedence for a month: override, then the last history entry effective on or
/// before the month, then the static rate. Non-positive values never resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTimeline {
    entries: BTreeMap<MonthKey, i64>,
    static_rate_cents: Option<i64>,
    overrides: BTreeMap<MonthKey, i64>,
}

impl RateTimeline {
    pub fn new(entries: &[HourlyRateEntry], static_rate_cents: Option<i64>) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|entry| (entry.effective_month, entry.rate_cents))
                .collect(),
            static_rate_cents,
            overrides: BTreeMap::new(),
        }
    }

    /// Copy of the timeline with `overrides` replacing specific months. The stored
    /// history is left untouched.
    pub fn with_overrides(&self, overrides: &BTreeMap<MonthKey, i64>) -> Self {
        let mut timeline = self.clone();
        timeline
            .overrides
            .extend(overrides.iter().map(|(month, rate)| (*month, *rate)));
        timeline
    }

    pub fn with_static_rate(mut self, static_rate_cents: Option<i64>) -> Self {
        self.static_rate_cents = static_rate_cents;
        self
    }

    pub fn static_rate_cents(&self) -> Option<i64> {
        self.static_rate_cents
    }

    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    pub fn rate_for(&self, month: MonthKey) -> Option<f64> {
        let cents = self
            .overrides
            .get(&month)
            .copied()
            .or_else(|| {
                self.entries
                    .range(..=month)
                    .next_back()
                    .map(|(_, rate)| *rate)
            })
            .or(self.static_rate_cents)?;
        (cents > 0).then_some(cents as f64)
    }

    /// Resolves every grid month. When `implied` is given, months left without a rate
    /// take `income / work_hours` from it instead.
    pub fn resolve(
        &self,
        grid: &MonthGrid,
        implied: Option<(&BTreeMap<MonthKey, f64>, f64)>,
    ) -> MonthlyRates {
        grid.iter()
            .map(|month| {
                let rate = self.rate_for(month).or_else(|| {
                    let (income, work_hours) = implied?;
                    let cents = *income.get(&month)?;
                    (cents > 0.0 && work_hours > 0.0).then(|| cents / work_hours)
                });
                (month, rate)
            })
            .collect()
    }
}
