//! Threshold, overrun and breakeven alerts evaluated against single-month runs.

pub mod evaluator;
pub mod rules;

pub use evaluator::{
    dedupe_key, AlertEvaluator, AlertNotification, AlertRunSummary, DeliveryOutcome,
    NotificationSink, NotifyError, RecordingSink,
};
pub use rules::{AlertCondition, AlertFinding, AlertRuleRecord};
