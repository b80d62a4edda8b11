//! Date-scoped FX resolution against a single anchor currency.
//!
//! Every stored observation reads "1 anchor = `rate` quote" on a given day. A
//! conversion between two non-anchor currencies triangulates through the anchor
//! using the latest observation of each leg dated on or before the query date.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timeledger_domain::CurrencyCode;

/// One stored FX observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxRate {
    pub base: CurrencyCode,
    pub quote: CurrencyCode,
    pub date: NaiveDate,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FxRate {
    pub fn new(
        base: impl Into<CurrencyCode>,
        quote: impl Into<CurrencyCode>,
        date: NaiveDate,
        rate: f64,
    ) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            date,
            rate,
            source: None,
        }
    }
}

/// A `(currency, day)` pair whose anchor rate a run needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FxKey {
    pub currency: CurrencyCode,
    pub date: NaiveDate,
}

impl FxKey {
    pub fn new(currency: CurrencyCode, date: NaiveDate) -> Self {
        Self { currency, date }
    }
}

/// Full rate history held by a data provider, keyed by quote currency.
#[derive(Debug, Clone, Default)]
pub struct FxBook {
    anchor: CurrencyCode,
    rates: HashMap<CurrencyCode, BTreeMap<NaiveDate, f64>>,
}

impl FxBook {
    pub fn new(anchor: CurrencyCode) -> Self {
        Self {
            anchor,
            rates: HashMap::new(),
        }
    }

    pub fn anchor(&self) -> &CurrencyCode {
        &self.anchor
    }

    /// Stores an observation. Rates quoted the other way round (`X -> anchor`) are
    /// inverted; pairs that do not involve the anchor are rejected.
    pub fn add_rate(&mut self, rate: &FxRate) -> bool {
        if !(rate.rate.is_finite() && rate.rate > 0.0) {
            return false;
        }
        let (currency, value) = if rate.base == self.anchor {
            (rate.quote.clone(), rate.rate)
        } else if rate.quote == self.anchor {
            (rate.base.clone(), 1.0 / rate.rate)
        } else {
            return false;
        };
        self.rates.entry(currency).or_default().insert(rate.date, value);
        true
    }

    /// Latest anchor rate for `currency` dated on or before `date`.
    pub fn lookup(&self, currency: &CurrencyCode, date: NaiveDate) -> Option<f64> {
        if *currency == self.anchor {
            return Some(1.0);
        }
        self.rates
            .get(currency)?
            .range(..=date)
            .next_back()
            .map(|(_, rate)| *rate)
    }

    /// Resolves every requested key in one pass.
    pub fn table_for<'a>(&self, keys: impl IntoIterator<Item = &'a FxKey>) -> FxTable {
        let mut table = FxTable::new(self.anchor.clone());
        for key in keys {
            table.insert(key.clone(), self.lookup(&key.currency, key.date));
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rates.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prefetched lookups for a single run. `None` records a key the provider could not resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FxTable {
    anchor: CurrencyCode,
    rates: HashMap<FxKey, Option<f64>>,
}

impl FxTable {
    pub fn new(anchor: CurrencyCode) -> Self {
        Self {
            anchor,
            rates: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: FxKey, rate: Option<f64>) {
        self.rates.insert(key, rate);
    }

    pub fn anchor(&self) -> &CurrencyCode {
        &self.anchor
    }

    fn anchor_rate(&self, currency: &CurrencyCode, date: NaiveDate) -> Option<f64> {
        if *currency == self.anchor {
            return Some(1.0);
        }
        self.rates
            .get(&FxKey::new(currency.clone(), date))
            .copied()
            .flatten()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Outcome of a single conversion lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FxConversion {
    Resolved(f64),
    /// No usable rate; the amount is carried over unconverted.
    Unresolved,
}

impl FxConversion {
    /// Multiplier to apply, parity when unresolved.
    pub fn multiplier(self) -> f64 {
        match self {
            FxConversion::Resolved(rate) => rate,
            FxConversion::Unresolved => 1.0,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, FxConversion::Resolved(_))
    }
}

/// Shared, read-only FX lookup handed to every computation of a run.
#[derive(Debug, Clone, Default)]
pub struct FxResolver {
    table: Arc<FxTable>,
}

impl FxResolver {
    pub fn new(table: FxTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Resolver with no observations; only same-currency conversions resolve.
    pub fn empty(anchor: CurrencyCode) -> Self {
        Self::new(FxTable::new(anchor))
    }

    pub fn anchor(&self) -> &CurrencyCode {
        self.table.anchor()
    }

    pub fn table(&self) -> &FxTable {
        &self.table
    }

    /// Multiplier turning an amount in `from` into `to` as of `date`.
    pub fn convert(&self, from: &CurrencyCode, to: &CurrencyCode, date: NaiveDate) -> FxConversion {
        if from == to {
            return FxConversion::Resolved(1.0);
        }
        let from_rate = self.table.anchor_rate(from, date);
        let to_rate = self.table.anchor_rate(to, date);
        match (from_rate, to_rate) {
            (Some(from_rate), Some(to_rate)) => FxConversion::Resolved(to_rate / from_rate),
            _ => FxConversion::Unresolved,
        }
    }

    /// Anchor legs a conversion needs; empty for same-currency pairs.
    pub fn keys_for(
        anchor: &CurrencyCode,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Vec<FxKey> {
        if from == to {
            return Vec::new();
        }
        [from, to]
            .into_iter()
            .filter(|code| *code != anchor)
            .map(|code| FxKey::new(code.clone(), date))
            .collect()
    }
}

/// Collects the anchor legs of many conversions.
pub fn collect_keys<'a>(
    anchor: &CurrencyCode,
    to: &CurrencyCode,
    conversions: impl IntoIterator<Item = (&'a CurrencyCode, NaiveDate)>,
) -> BTreeSet<FxKey> {
    conversions
        .into_iter()
        .flat_map(|(from, date)| FxResolver::keys_for(anchor, from, to, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book() -> FxBook {
        let mut book = FxBook::new("EUR".into());
        book.add_rate(&FxRate::new("EUR", "RON", date(2025, 8, 1), 4.97));
        book.add_rate(&FxRate::new("EUR", "RON", date(2025, 9, 1), 5.02));
        book.add_rate(&FxRate::new("EUR", "USD", date(2025, 8, 1), 1.10));
        book
    }

    fn resolver(keys: &[FxKey]) -> FxResolver {
        FxResolver::new(book().table_for(keys))
    }

    #[test]
    fn same_currency_is_parity() {
        let resolver = FxResolver::empty("EUR".into());
        assert_eq!(
            resolver.convert(&"RON".into(), &"RON".into(), date(1999, 1, 1)),
            FxConversion::Resolved(1.0)
        );
    }

    #[test]
    fn uses_latest_rate_not_after_query_date() {
        let day = date(2025, 8, 15);
        let resolver = resolver(&[FxKey::new("RON".into(), day)]);
        let conversion = resolver.convert(&"EUR".into(), &"RON".into(), day);
        assert_eq!(conversion, FxConversion::Resolved(4.97));
    }

    #[test]
    fn never_looks_ahead() {
        let day = date(2025, 7, 31);
        let resolver = resolver(&[FxKey::new("RON".into(), day)]);
        assert_eq!(
            resolver.convert(&"EUR".into(), &"RON".into(), day),
            FxConversion::Unresolved
        );
        assert_eq!(FxConversion::Unresolved.multiplier(), 1.0);
    }

    #[test]
    fn triangulates_through_anchor() {
        let day = date(2025, 8, 20);
        let keys = [FxKey::new("RON".into(), day), FxKey::new("USD".into(), day)];
        let resolver = resolver(&keys);
        let usd_to_ron = resolver.convert(&"USD".into(), &"RON".into(), day).multiplier();
        let ron_to_usd = resolver.convert(&"RON".into(), &"USD".into(), day).multiplier();
        assert!((usd_to_ron - 4.97 / 1.10).abs() < 1e-12);
        assert!((usd_to_ron * ron_to_usd - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_quotes_are_normalized() {
        let mut book = FxBook::new("EUR".into());
        assert!(book.add_rate(&FxRate::new("GBP", "EUR", date(2025, 1, 1), 1.25)));
        assert!(!book.add_rate(&FxRate::new("GBP", "USD", date(2025, 1, 1), 1.3)));
        assert!(!book.add_rate(&FxRate::new("EUR", "CHF", date(2025, 1, 1), 0.0)));
        assert_eq!(book.lookup(&"GBP".into(), date(2025, 2, 1)), Some(0.8));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn keys_skip_anchor_and_parity() {
        let anchor: CurrencyCode = "EUR".into();
        let day = date(2025, 8, 1);
        assert!(FxResolver::keys_for(&anchor, &"USD".into(), &"USD".into(), day).is_empty());
        assert_eq!(
            FxResolver::keys_for(&anchor, &"EUR".into(), &"RON".into(), day),
            vec![FxKey::new("RON".into(), day)]
        );
        assert_eq!(FxResolver::keys_for(&anchor, &"USD".into(), &"RON".into(), day).len(), 2);
    }
}
