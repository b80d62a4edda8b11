pub mod aggregation_service;
pub mod analytics_service;
pub mod budget_service;
pub mod conversion;
pub mod evaluation_service;
pub mod forecast_service;

pub use aggregation_service::{AggregationService, IncomeAggregate, SpendingAggregate};
pub use analytics_service::AnalyticsService;
pub use budget_service::{BudgetAggregate, BudgetService};
pub use conversion::{ConversionService, Diagnostics};
pub use evaluation_service::{EvaluationService, WindowRequest};
pub use forecast_service::{Forecast, ForecastService};
