use std::collections::BTreeSet;

use chrono::NaiveDate;
use timeledger_domain::{CurrencyCode, MonthKey};

use crate::core::context::EngineContext;

/// Degraded conversions noticed during one run, reported once each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: BTreeSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.insert(message);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings.into_iter().collect()
    }
}

pub struct ConversionService;

impl ConversionService {
    /// Converts `amount_cents` from `currency` into the context's base currency as of
    /// `date`. An unresolved pair is carried at parity and recorded in `diagnostics`.
    pub fn to_base(
        ctx: &EngineContext,
        amount_cents: f64,
        currency: &CurrencyCode,
        date: NaiveDate,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let conversion = ctx.fx.convert(currency, &ctx.base_currency, date);
        if !conversion.is_resolved() {
            diagnostics.warn(format!(
                "fx {}->{} unresolved on {}; multiplier 1 assumed",
                currency, ctx.base_currency, date
            ));
        }
        amount_cents * conversion.multiplier()
    }

    /// `amount / rate`, absent when the rate is.
    pub fn to_hours(amount_cents: f64, rate_cents: Option<f64>) -> Option<f64> {
        rate_cents.map(|rate| amount_cents / rate)
    }

    /// Splits `amount` into `span` monthly installments starting at `start`. Every part
    /// keeps the sign of `amount`: whole minor units left over after the even split go
    /// one per month from the start, and any sub-unit fraction lands in the last month,
    /// so the parts always add back to `amount`. Spans below two collapse to a single month.
    pub fn amortize(amount: f64, start: MonthKey, span: i32) -> Vec<(MonthKey, f64)> {
        if span <= 1 {
            return vec![(start, amount)];
        }
        let sign = amount.signum();
        let magnitude = amount.abs();
        let installment = (magnitude / span as f64).floor();
        let leftover = magnitude - installment * span as f64;
        let extra_units = leftover.floor() as i32;
        let fraction = leftover - extra_units as f64;
        (0..span)
            .map(|offset| {
                let mut value = installment;
                if offset < extra_units {
                    value += 1.0;
                }
                if offset == span - 1 {
                    value += fraction;
                }
                (start.add_months(offset as i64), sign * value)
            })
            .collect()
    }

    /// One-time expense recognized over the configured span.
    pub fn amortize_one_time(
        ctx: &EngineContext,
        amount: f64,
        start: MonthKey,
    ) -> Vec<(MonthKey, f64)> {
        Self::amortize(amount, start, ctx.one_time_amortization_months)
    }

    /// Object purchase recognized over the configured capex span.
    pub fn amortize_capex(
        ctx: &EngineContext,
        amount: f64,
        purchase: MonthKey,
    ) -> Vec<(MonthKey, f64)> {
        Self::amortize(amount, purchase, ctx.capex_amortization_months)
    }
}
