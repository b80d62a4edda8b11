//! Expands a frequency plus date range into concrete occurrence dates.
//!
//! Periodic anchors are always derived from the original start date
//! (`start + k * period`), so month-end starts keep their day where the calendar
//! allows it instead of drifting after a short month.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use timeledger_domain::{Frequency, MonthKey};

use super::{shift_months, shift_years, MonthGrid};

/// Upper bound on anchors visited for a single rule.
pub const MAX_OCCURRENCES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub active: bool,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, start: NaiveDate) -> Self {
        Self {
            frequency,
            start,
            end: None,
            active: true,
        }
    }

    pub fn until(mut self, end: Option<NaiveDate>) -> Self {
        self.end = end;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Anchor number `step`, counted from the start date.
    fn anchor(&self, step: i64) -> NaiveDate {
        match self.frequency {
            Frequency::Once => self.start,
            Frequency::Weekly => self.start + Duration::days(7 * step),
            Frequency::Monthly => shift_months(self.start, step),
            Frequency::Yearly => shift_years(self.start, step),
        }
    }

    /// Conservative first step that cannot land after `lower`.
    fn first_step_near(&self, lower: NaiveDate) -> i64 {
        if lower <= self.start {
            return 0;
        }
        let step = match self.frequency {
            Frequency::Once => 0,
            Frequency::Weekly => (lower - self.start).num_days() / 7,
            Frequency::Monthly => {
                MonthKey::from_date(lower).months_since(MonthKey::from_date(self.start)) - 1
            }
            Frequency::Yearly => {
                (MonthKey::from_date(lower).months_since(MonthKey::from_date(self.start))) / 12 - 1
            }
        };
        step.max(0)
    }

    /// Occurrence dates within `[lower, upper]`, further clipped by the rule's own
    /// `[start, end]` range. Inactive rules and rules ending before they start yield nothing.
    pub fn occurrences_between(&self, lower: NaiveDate, upper: NaiveDate) -> Vec<NaiveDate> {
        if !self.active || self.end.is_some_and(|end| end < self.start) {
            return Vec::new();
        }
        let upper = match self.end {
            Some(end) => end.min(upper),
            None => upper,
        };
        if self.frequency == Frequency::Once {
            return if (lower..=upper).contains(&self.start) {
                vec![self.start]
            } else {
                Vec::new()
            };
        }
        let lower = lower.max(self.start);
        if lower > upper {
            return Vec::new();
        }

        let mut dates = Vec::new();
        let mut step = self.first_step_near(lower);
        for _ in 0..MAX_OCCURRENCES {
            let anchor = self.anchor(step);
            if anchor > upper {
                break;
            }
            if anchor >= lower {
                dates.push(anchor);
            }
            step += 1;
        }
        dates
    }

    /// Occurrences inside `grid`. Open-ended periodic rules stop at `as_of` when one is
    /// given; a `once` row is never cut by `as_of`.
    pub fn occurrences_in(&self, grid: &MonthGrid, as_of: Option<NaiveDate>) -> Vec<NaiveDate> {
        let mut upper = grid.end_date();
        if self.frequency.is_recurring() {
            if let Some(as_of) = as_of {
                upper = upper.min(as_of);
            }
        }
        self.occurrences_between(grid.start_date(), upper)
    }

    /// Occurrence count for every month of `grid`, zero-filled.
    pub fn counts_by_month(
        &self,
        grid: &MonthGrid,
        as_of: Option<NaiveDate>,
    ) -> BTreeMap<MonthKey, u32> {
        let mut counts: BTreeMap<MonthKey, u32> = grid.iter().map(|month| (month, 0)).collect();
        for date in self.occurrences_in(grid, as_of) {
            if let Some(count) = counts.get_mut(&MonthKey::from_date(date)) {
                *count += 1;
            }
        }
        counts
    }
}
