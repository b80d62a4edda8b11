//! The time-value pipeline: context, series, services, engine and scenarios.

pub mod context;
pub mod engine;
pub mod prefetch;
pub mod result;
pub mod series;
pub mod services;
pub mod simulation;

pub use context::{EngineContext, ForecastSettings};
pub use engine::TimeValueEngine;
pub use result::AggregateResult;
