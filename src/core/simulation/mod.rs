//! What-if scenarios: row ops, the fold that applies them and the baseline diff.

mod diff;
mod engine;
mod types;

pub use diff::{ActivityRoiDelta, AggregateDiff, GoalDelta, ObjectMetricsDelta};
pub use engine::ScenarioEngine;
pub use types::{
    ActivityOp, ActivityPatch, ExpenseOp, ExpensePatch, IncomeOp, IncomePatch, ObjectOp,
    ObjectPatch, RowOp, RowPatch, Scenario, ScenarioComparison,
};
