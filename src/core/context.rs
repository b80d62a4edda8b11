use std::collections::BTreeMap;

use chrono::NaiveDate;
use timeledger_config::EngineSettings;
use timeledger_domain::{CurrencyCode, HourlyRateEntry, MonthKey, UserProfile};

use crate::currency::{FxResolver, FxTable};
use crate::rates::RateTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSettings {
    pub horizon_months: u32,
    pub trailing_months: u32,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_months: EngineSettings::default_forecast_horizon_months(),
            trailing_months: EngineSettings::default_forecast_trailing_months(),
        }
    }
}

/// Immutable inputs shared by every computation of one run.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub base_currency: CurrencyCode,
    pub rates: RateTimeline,
    pub fx: FxResolver,
    pub one_time_amortization_months: i32,
    pub capex_amortization_months: i32,
    pub implied_salary: bool,
    pub work_hours_per_month: f64,
    pub forecast: ForecastSettings,
    /// Open-ended recurring rows stop expanding after this day.
    pub as_of: Option<NaiveDate>,
}

impl EngineContext {
    /// Context with engine defaults, no rates and no FX observations.
    pub fn new(base_currency: CurrencyCode) -> Self {
        Self::from_settings(&EngineSettings::default(), None, &[])
            .with_base_currency(base_currency)
    }

    /// Builds a context from global settings, letting the user's profile override
    /// base currency, static rate and the implied-salary toggle.
    pub fn from_settings(
        settings: &EngineSettings,
        profile: Option<&UserProfile>,
        timeline: &[HourlyRateEntry],
    ) -> Self {
        let base_currency = profile
            .and_then(|profile| profile.base_currency.clone())
            .unwrap_or_else(|| CurrencyCode::new(settings.base_currency.as_str()));
        let static_rate = profile
            .and_then(|profile| profile.static_hourly_rate_cents)
            .or(settings.static_hourly_rate_cents);
        let implied_salary = profile
            .and_then(|profile| profile.implied_salary)
            .unwrap_or(settings.implied_salary);
        Self {
            base_currency,
            rates: RateTimeline::new(timeline, static_rate),
            fx: FxResolver::empty(CurrencyCode::new(settings.anchor_currency.as_str())),
            one_time_amortization_months: settings.one_time_amortization_months,
            capex_amortization_months: settings.capex_amortization_months,
            implied_salary,
            work_hours_per_month: settings.work_hours_per_month,
            forecast: ForecastSettings {
                horizon_months: settings.forecast_horizon_months,
                trailing_months: settings.forecast_trailing_months,
            },
            as_of: None,
        }
    }

    pub fn with_base_currency(mut self, base_currency: CurrencyCode) -> Self {
        self.base_currency = base_currency;
        self
    }

    pub fn with_static_rate(mut self, rate_cents: Option<i64>) -> Self {
        self.rates = std::mem::take(&mut self.rates).with_static_rate(rate_cents);
        self
    }

    pub fn with_timeline(mut self, timeline: RateTimeline) -> Self {
        self.rates = timeline;
        self
    }

    pub fn with_fx_table(mut self, table: FxTable) -> Self {
        self.fx = FxResolver::new(table);
        self
    }

    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    /// Copy used for a scenario run; the baseline context is left as is.
    pub fn with_rate_overrides(&self, overrides: &BTreeMap<MonthKey, i64>) -> Self {
        let mut ctx = self.clone();
        ctx.rates = self.rates.with_overrides(overrides);
        ctx
    }

    pub fn static_hourly_rate_cents(&self) -> Option<i64> {
        self.rates.static_rate_cents()
    }

    pub fn anchor_currency(&self) -> &CurrencyCode {
        self.fx.anchor()
    }
}
