#![doc(test(attr(deny(warnings))))]

//! Timeledger turns incomes, expenses, objects, activities, budgets and goals into
//! per-month money and hour series, compares what-if scenarios against a baseline,
//! forecasts the net time burn and evaluates alert rules on top of the same pipeline.

pub mod alerts;
pub mod calendar;
pub mod cli;
pub mod core;
pub mod currency;
pub mod errors;
pub mod provider;
pub mod rates;
pub mod utils;

pub use timeledger_config as config;
pub use timeledger_domain as domain;

pub use crate::core::{AggregateResult, EngineContext, TimeValueEngine};
pub use errors::{EngineError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    init_with(utils::DEFAULT_LOG_DIRECTIVE);
}

/// Like [`init`], with a filter directive taken from the engine settings.
pub fn init_with(directive: &str) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing_with(directive);
        tracing::info!(directive, "Timeledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
