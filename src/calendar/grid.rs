use chrono::NaiveDate;
use serde::Serialize;
use timeledger_domain::MonthKey;

use crate::errors::{EngineError, Result};

/// Ordered, gap-free list of months covered by one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthGrid {
    months: Vec<MonthKey>,
}

impl MonthGrid {
    /// Inclusive range `from..=to`.
    pub fn new(from: MonthKey, to: MonthKey) -> Result<Self> {
        if from > to {
            return Err(EngineError::InvalidWindow { from, to });
        }
        let span = to.months_since(from);
        let months = (0..=span).map(|offset| from.add_months(offset)).collect();
        Ok(Self { months })
    }

    /// The single-month grid used by alert evaluation.
    pub fn single(month: MonthKey) -> Self {
        Self {
            months: vec![month],
        }
    }

    /// `count` months ending at (and including) `end`. A zero count yields one month.
    pub fn trailing(end: MonthKey, count: u32) -> Self {
        let span = count.max(1) as i64 - 1;
        let months = (0..=span)
            .rev()
            .filter_map(|back| end.checked_add_months(-back))
            .collect();
        Self { months }
    }

    pub fn months(&self) -> &[MonthKey] {
        &self.months
    }

    pub fn iter(&self) -> impl Iterator<Item = MonthKey> + '_ {
        self.months.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn first(&self) -> MonthKey {
        self.months[0]
    }

    pub fn last(&self) -> MonthKey {
        self.months[self.months.len() - 1]
    }

    pub fn contains(&self, month: MonthKey) -> bool {
        month >= self.first() && month <= self.last()
    }

    /// Position of `month` inside the grid.
    pub fn index_of(&self, month: MonthKey) -> Option<usize> {
        self.contains(month)
            .then(|| month.months_since(self.first()) as usize)
    }

    /// First day of the first month.
    pub fn start_date(&self) -> NaiveDate {
        self.first().first_day()
    }

    /// Last day of the last month.
    pub fn end_date(&self) -> NaiveDate {
        self.last().last_day()
    }

    /// The `count` months following the grid, fewer when the calendar runs out.
    pub fn following(&self, count: u32) -> Vec<MonthKey> {
        let last = self.last();
        (1..=count as i64)
            .map_while(|offset| last.checked_add_months(offset))
            .collect()
    }
}
