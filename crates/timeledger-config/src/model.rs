use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

/// Engine-wide defaults. Per-user profile values from the data provider take
/// precedence for the fields they carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "EngineSettings::default_base_currency")]
    pub base_currency: String,
    /// Currency every stored FX observation is quoted against.
    #[serde(default = "EngineSettings::default_anchor_currency")]
    pub anchor_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_hourly_rate_cents: Option<i64>,
    #[serde(default = "EngineSettings::default_one_time_amortization_months")]
    pub one_time_amortization_months: i32,
    #[serde(default = "EngineSettings::default_capex_amortization_months")]
    pub capex_amortization_months: i32,
    #[serde(default)]
    pub implied_salary: bool,
    #[serde(default = "EngineSettings::default_work_hours_per_month")]
    pub work_hours_per_month: f64,
    #[serde(default = "EngineSettings::default_forecast_horizon_months")]
    pub forecast_horizon_months: u32,
    #[serde(default = "EngineSettings::default_forecast_trailing_months")]
    pub forecast_trailing_months: u32,
    #[serde(default = "EngineSettings::default_window_months")]
    pub default_window_months: u32,
    #[serde(default = "EngineSettings::default_log_filter")]
    pub log_filter: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    /// Optional dataset file used by the CLI when `--data` is omitted.
    pub default_dataset: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_currency: Self::default_base_currency(),
            anchor_currency: Self::default_anchor_currency(),
            static_hourly_rate_cents: None,
            one_time_amortization_months: Self::default_one_time_amortization_months(),
            capex_amortization_months: Self::default_capex_amortization_months(),
            implied_salary: false,
            work_hours_per_month: Self::default_work_hours_per_month(),
            forecast_horizon_months: Self::default_forecast_horizon_months(),
            forecast_trailing_months: Self::default_forecast_trailing_months(),
            default_window_months: Self::default_window_months(),
            log_filter: Self::default_log_filter(),
            default_dataset: None,
        }
    }
}

impl EngineSettings {
    pub fn default_base_currency() -> String {
        "USD".into()
    }

    pub fn default_anchor_currency() -> String {
        "EUR".into()
    }

    pub fn default_one_time_amortization_months() -> i32 {
        1
    }

    pub fn default_capex_amortization_months() -> i32 {
        12
    }

    pub fn default_work_hours_per_month() -> f64 {
        160.0
    }

    pub fn default_forecast_horizon_months() -> u32 {
        3
    }

    pub fn default_forecast_trailing_months() -> u32 {
        6
    }

    pub fn default_window_months() -> u32 {
        12
    }

    pub fn default_log_filter() -> String {
        "timeledger=info".into()
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, code) in [
            ("base_currency", &self.base_currency),
            ("anchor_currency", &self.anchor_currency),
        ] {
            if code.len() != 3 || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("`{}` is not a three-letter currency code", code),
                });
            }
        }
        if matches!(self.static_hourly_rate_cents, Some(rate) if rate <= 0) {
            return Err(ConfigError::Invalid {
                field: "static_hourly_rate_cents",
                reason: "must be positive when set".into(),
            });
        }
        if !(self.work_hours_per_month.is_finite() && self.work_hours_per_month > 0.0) {
            return Err(ConfigError::Invalid {
                field: "work_hours_per_month",
                reason: "must be a positive number".into(),
            });
        }
        if self.default_window_months == 0 {
            return Err(ConfigError::Invalid {
                field: "default_window_months",
                reason: "must cover at least one month".into(),
            });
        }
        Ok(())
    }

    /// Directory that holds `config/config.json` when no explicit base is given.
    pub fn resolve_default_base_dir() -> PathBuf {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("timeledger")
    }
}
