//! Calendar month keys used as the aggregation grain.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Identifies a calendar month, rendered as `YYYY-MM`.
///
/// Ordering is chronological, which also matches the lexicographic order of the
/// rendered form for four-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonthKeyError {
    #[error("month key `{0}` is not in YYYY-MM form")]
    Malformed(String),
    #[error("month {month} of year {year} is out of range")]
    OutOfRange { year: i32, month: u32 },
}

impl MonthKey {
    /// Builds a key, rejecting months outside `1..=12` and years chrono cannot represent.
    pub fn new(year: i32, month: u32) -> Result<Self, MonthKeyError> {
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(MonthKeyError::OutOfRange { year, month });
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing `date`, clamped to years `1..=9999`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_ordinal(date.year() as i64 * 12 + date.month0() as i64)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month. Keys only hold years `1..=9999`, all of which
    /// chrono represents.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month.
    pub fn last_day(&self) -> NaiveDate {
        let next_first = match self.checked_add_months(1) {
            Some(next) => next.first_day(),
            None => NaiveDate::from_ymd_opt(self.year + 1, 1, 1).unwrap_or(NaiveDate::MAX),
        };
        next_first.pred_opt().unwrap_or_else(|| self.first_day())
    }

    /// Whether `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Months elapsed since year zero; consecutive months differ by one.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn min_ordinal() -> i64 {
        MIN_YEAR as i64 * 12
    }

    fn max_ordinal() -> i64 {
        MAX_YEAR as i64 * 12 + 11
    }

    /// Saturates at `0001-01` and `9999-12`.
    fn from_ordinal(ordinal: i64) -> Self {
        let ordinal = ordinal.clamp(Self::min_ordinal(), Self::max_ordinal());
        let year = ordinal.div_euclid(12) as i32;
        let month = ordinal.rem_euclid(12) as u32 + 1;
        Self { year, month }
    }

    /// Shifts the key by `months`, which may be negative, saturating at the first and
    /// last representable months.
    pub fn add_months(&self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal().saturating_add(months))
    }

    /// Like [`MonthKey::add_months`], but `None` when the result leaves years `1..=9999`.
    pub fn checked_add_months(&self, months: i64) -> Option<Self> {
        let ordinal = self.ordinal().checked_add(months)?;
        (Self::min_ordinal()..=Self::max_ordinal())
            .contains(&ordinal)
            .then(|| Self::from_ordinal(ordinal))
    }

    pub fn succ(&self) -> Self {
        self.add_months(1)
    }

    pub fn pred(&self) -> Self {
        self.add_months(-1)
    }

    /// Signed number of months from `earlier` to `self`.
    pub fn months_since(&self, earlier: MonthKey) -> i64 {
        self.ordinal() - earlier.ordinal()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| MonthKeyError::Malformed(raw.to_string()))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(MonthKeyError::Malformed(raw.to_string()));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| MonthKeyError::Malformed(raw.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| MonthKeyError::Malformed(raw.to_string()))?;
        MonthKey::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_round_trip() {
        let key: MonthKey = "2025-08".parse().unwrap();
        assert_eq!(key.year(), 2025);
        assert_eq!(key.month(), 8);
        assert_eq!(key.to_string(), "2025-08");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("2025-8".parse::<MonthKey>().is_err());
        assert!("2025-13".parse::<MonthKey>().is_err());
        assert!("august".parse::<MonthKey>().is_err());
    }

    #[test]
    fn arithmetic_crosses_year_boundaries() {
        let dec = MonthKey::new(2024, 12).unwrap();
        assert_eq!(dec.succ(), MonthKey::new(2025, 1).unwrap());
        assert_eq!(dec.add_months(-12), MonthKey::new(2023, 12).unwrap());
        assert_eq!(MonthKey::new(2025, 3).unwrap().months_since(dec), 3);
    }

    #[test]
    fn arithmetic_saturates_at_the_supported_years() {
        let last = MonthKey::new(9999, 12).unwrap();
        assert_eq!(last.succ(), last);
        assert_eq!(last.checked_add_months(1), None);
        assert_eq!(last.last_day(), NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());

        let first = MonthKey::new(1, 1).unwrap();
        assert_eq!(first.add_months(-5), first);
        assert_eq!(first.checked_add_months(-1), None);
        assert_eq!(first.first_day(), NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
        assert_eq!(first.add_months(i64::MAX), last);

        let early = NaiveDate::from_ymd_opt(-40, 6, 1).unwrap();
        assert_eq!(MonthKey::from_date(early), first);
        assert_eq!(
            MonthKey::new(2025, 11).unwrap().checked_add_months(3),
            Some(MonthKey::new(2026, 2).unwrap())
        );
    }

    #[test]
    fn ordering_matches_rendered_order() {
        let mut keys = vec![
            MonthKey::new(2025, 10).unwrap(),
            MonthKey::new(2024, 12).unwrap(),
            MonthKey::new(2025, 2).unwrap(),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let mut lexicographic = rendered.clone();
        lexicographic.sort();
        assert_eq!(rendered, lexicographic);
    }

    #[test]
    fn day_bounds_respect_leap_years() {
        let feb = MonthKey::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(feb.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(!feb.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = MonthKey::new(2025, 7).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2025-07\"");
        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
