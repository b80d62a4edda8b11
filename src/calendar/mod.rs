//! Month grid construction and recurrence expansion.

pub mod grid;
pub mod recurrence;

pub use grid::MonthGrid;
pub use recurrence::{RecurrenceRule, MAX_OCCURRENCES};

use chrono::{Datelike, NaiveDate};
use timeledger_domain::MonthKey;

/// Shifts `date` by whole months, clamping the day to the target month's length
/// (Jan 31 + 1 month = Feb 28/29).
pub fn shift_months(date: NaiveDate, months: i64) -> NaiveDate {
    let target = MonthKey::from_date(date).add_months(months);
    let day = date.day().min(target.last_day().day());
    target.first_day().with_day(day).unwrap_or_else(|| target.last_day())
}

/// Shifts `date` by whole years with the same clamping as [`shift_months`].
pub fn shift_years(date: NaiveDate, years: i64) -> NaiveDate {
    shift_months(date, years * 12)
}
