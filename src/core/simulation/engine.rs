use std::collections::BTreeMap;
use std::thread;

use timeledger_domain::{BelongsToCategory, Identifiable, RowSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::MonthGrid;
use crate::core::context::EngineContext;
use crate::core::engine::TimeValueEngine;

use super::diff::AggregateDiff;
use super::types::{RowOp, RowPatch, Scenario, ScenarioComparison};

/// Applies scenarios to row sets and diffs the two pipeline runs.
pub struct ScenarioEngine;

impl ScenarioEngine {
    /// Returns the scenario's view of `rows`. The input is only read; every change lands
    /// on clones.
    pub fn apply(rows: &RowSet, scenario: &Scenario) -> RowSet {
        let incomes = fold_ops("income", &rows.incomes, &scenario.incomes);
        let mut expenses = fold_ops("expense", &rows.expenses, &scenario.expenses);
        let mut objects = fold_ops("object", &rows.objects, &scenario.objects);
        let mut activities = fold_ops("activity", &rows.activities, &scenario.activities);

        if !scenario.category_scaling.is_empty() {
            let scaling = &scenario.category_scaling;
            for expense in &mut expenses {
                if let Some(factor) = factor_for(scaling, expense) {
                    expense.amount_cents = scale_cents(expense.amount_cents, factor);
                }
            }
            for object in &mut objects {
                if let Some(factor) = factor_for(scaling, object) {
                    object.price_cents = scale_cents(object.price_cents, factor);
                    object.maintenance_cents_per_month =
                        scale_cents(object.maintenance_cents_per_month, factor);
                }
            }
            for activity in &mut activities {
                if let Some(factor) = factor_for(scaling, activity) {
                    activity.direct_cost_cents = scale_cents(activity.direct_cost_cents, factor);
                }
            }
        }

        RowSet {
            incomes,
            expenses,
            objects,
            activities,
            budget_allocations: scenario
                .budget_allocations
                .clone()
                .unwrap_or_else(|| rows.budget_allocations.clone()),
            goals: rows.goals.clone(),
            goal_contributions: rows.goal_contributions.clone(),
        }
    }

    /// Runs the baseline and the scenario over the same grid and diffs them. The
    /// scenario run sees the scenario's hourly-rate overrides, the baseline does not.
    pub fn compare(
        rows: &RowSet,
        ctx: &EngineContext,
        grid: &MonthGrid,
        scenario: &Scenario,
    ) -> ScenarioComparison {
        info!(
            scenario = %scenario.id,
            ops = scenario.op_count(),
            overrides = scenario.hourly_rate_overrides.len(),
            "comparing scenario against baseline"
        );
        let scenario_rows = Self::apply(rows, scenario);
        let scenario_ctx = ctx.with_rate_overrides(&scenario.hourly_rate_overrides);

        let (baseline, projected) = thread::scope(|scope| {
            let baseline = scope.spawn(|| TimeValueEngine::run(rows, ctx, grid));
            let projected = TimeValueEngine::run(&scenario_rows, &scenario_ctx, grid);
            let baseline = baseline
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (baseline, projected)
        });

        let diff = AggregateDiff::between(&baseline, &projected);
        ScenarioComparison {
            months: grid.months().to_vec(),
            baseline,
            scenario: projected,
            diff,
        }
    }
}

fn fold_ops<R, P>(entity: &str, rows: &[R], ops: &[RowOp<R, P>]) -> Vec<R>
where
    R: Identifiable + Clone,
    P: RowPatch<R>,
{
    ops.iter().fold(rows.to_vec(), |mut acc, op| {
        match op {
            RowOp::Add { row } => acc.push(row.clone()),
            RowOp::Edit { id, patch } => match acc.iter_mut().find(|row| row.id() == *id) {
                Some(row) => patch.apply_to(row),
                None => debug!(entity, %id, "edit targets unknown row; skipped"),
            },
            RowOp::Remove { id } => {
                let before = acc.len();
                acc.retain(|row| row.id() != *id);
                if acc.len() == before {
                    debug!(entity, %id, "remove targets unknown row; skipped");
                }
            }
            RowOp::Noop => {}
        }
        acc
    })
}

fn factor_for<R: BelongsToCategory>(scaling: &BTreeMap<Uuid, f64>, row: &R) -> Option<f64> {
    let factor = *scaling.get(&row.category_id()?)?;
    factor.is_finite().then_some(factor)
}

fn scale_cents(cents: i64, factor: f64) -> i64 {
    (cents as f64 * factor).round().max(0.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::types::ExpensePatch;
    use chrono::NaiveDate;
    use timeledger_domain::{Expense, Frequency, Object};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rows() -> (RowSet, Uuid) {
        let category = Uuid::new_v4();
        let streaming = Expense::new(1_500, "EUR".into(), Frequency::Monthly, date(2025, 1, 1))
            .with_category(category);
        let rent = Expense::new(90_000, "EUR".into(), Frequency::Monthly, date(2025, 1, 1));
        let mut laptop = Object::new("laptop", 120_000, "EUR".into(), date(2025, 3, 1));
        laptop.category_id = Some(category);
        laptop.maintenance_cents_per_month = 1_001;
        (
            RowSet {
                expenses: vec![streaming, rent],
                objects: vec![laptop],
                ..RowSet::default()
            },
            category,
        )
    }

    #[test]
    fn ops_fold_over_clones() {
        let (rows, _) = rows();
        let original = rows.clone();
        let mut scenario = Scenario::new("trim");
        scenario.expenses = vec![
            RowOp::Remove { id: rows.expenses[0].id },
            RowOp::Edit {
                id: rows.expenses[1].id,
                patch: ExpensePatch {
                    amount_cents: Some(80_000),
                    ..ExpensePatch::default()
                },
            },
            RowOp::Remove { id: Uuid::new_v4() },
        ];
        let applied = ScenarioEngine::apply(&rows, &scenario);
        assert_eq!(rows, original);
        assert_eq!(applied.expenses.len(), 1);
        assert_eq!(applied.expenses[0].amount_cents, 80_000);
    }

    #[test]
    fn category_scaling_rounds_and_skips_other_rows() {
        let (rows, category) = rows();
        let mut scenario = Scenario::new("halve");
        scenario.category_scaling.insert(category, 0.5);
        let applied = ScenarioEngine::apply(&rows, &scenario);
        assert_eq!(applied.expenses[0].amount_cents, 750);
        assert_eq!(applied.expenses[1].amount_cents, 90_000);
        assert_eq!(applied.objects[0].price_cents, 60_000);
        assert_eq!(applied.objects[0].maintenance_cents_per_month, 501);
    }

    #[test]
    fn empty_scenario_returns_equal_rows() {
        let (rows, _) = rows();
        assert_eq!(ScenarioEngine::apply(&rows, &Scenario::new("noop")), rows);
    }

    #[test]
    fn negative_factor_clamps_to_zero() {
        assert_eq!(scale_cents(1_000, -2.0), 0);
        assert_eq!(scale_cents(999, 1.5), 1_499);
    }
}
