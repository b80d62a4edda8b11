mod common;

use std::sync::Arc;

use common::{assert_close, date, eur, eur_context, grid, month, user_data};
use serde_json::json;
use timeledger::config::EngineSettings;
use timeledger::core::services::{EvaluationService, WindowRequest};
use timeledger::core::simulation::{ExpensePatch, RowOp, Scenario, ScenarioEngine};
use timeledger::domain::{
    BudgetAllocation, Expense, Frequency, Income, Object, RowSet, UserProfile,
};
use timeledger::provider::{Dataset, JsonDataProvider};
use timeledger::EngineError;
use uuid::Uuid;

fn household() -> (RowSet, Uuid, Uuid) {
    let streaming = Expense::new(5_000, eur(), Frequency::Monthly, date(2025, 1, 1));
    let groceries = Uuid::new_v4();
    let mut dishwasher = Object::new("dishwasher", 60_000, eur(), date(2025, 3, 1));
    dishwasher.hours_saved_per_month = 4.0;
    let rows = RowSet {
        incomes: vec![Income::new(date(2025, 1, 25), 300_000, eur()).recurring()],
        expenses: vec![
            streaming.clone(),
            Expense::new(6_000, eur(), Frequency::Monthly, date(2025, 1, 1))
                .with_category(groceries),
        ],
        objects: vec![dishwasher],
        budget_allocations: vec![BudgetAllocation::new(
            groceries,
            30_000,
            eur(),
            date(2025, 8, 1),
            date(2025, 8, 31),
        )],
        ..RowSet::default()
    };
    (rows, streaming.id, groceries)
}

#[test]
fn empty_scenario_reproduces_the_baseline() {
    let (rows, _, _) = household();
    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(Some(1_000)),
        &grid("2025-06", "2025-09"),
        &Scenario::new("nothing changes"),
    );
    assert!(comparison.diff.is_zero());
    assert_eq!(comparison.baseline, comparison.scenario);
    assert_eq!(comparison.months.len(), 4);
}

#[test]
fn removing_an_expense_shows_up_in_the_diff_only() {
    let (rows, streaming, _) = household();
    let mut scenario = Scenario::new("cancel streaming");
    scenario.expenses.push(RowOp::Remove { id: streaming });

    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(Some(1_000)),
        &grid("2025-08", "2025-08"),
        &scenario,
    );
    let august = month("2025-08");

    assert_eq!(comparison.baseline.expense_money[&august], 110.0);
    assert_eq!(comparison.scenario.expense_money[&august], 60.0);
    assert_eq!(comparison.diff.expense_money[&august], -50.0);
    assert_close(comparison.diff.expense_hours[&august], -5.0);
    assert_eq!(rows.expenses.len(), 2);
}

#[test]
fn edits_and_additions_fold_in_order() {
    let (rows, streaming, _) = household();
    let mut scenario = Scenario::new("upgrade plan");
    scenario.expenses.push(RowOp::Edit {
        id: streaming,
        patch: ExpensePatch {
            amount_cents: Some(8_000),
            ..ExpensePatch::default()
        },
    });
    scenario.incomes.push(RowOp::Add {
        row: Income::new(date(2025, 8, 10), 20_000, eur()).with_source("side gig"),
    });
    scenario.expenses.push(RowOp::Remove { id: Uuid::new_v4() });

    let applied = ScenarioEngine::apply(&rows, &scenario);
    assert_eq!(applied.expenses[0].amount_cents, 8_000);
    assert_eq!(applied.incomes.len(), 2);
    assert_eq!(rows.expenses[0].amount_cents, 5_000);

    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(Some(1_000)),
        &grid("2025-08", "2025-09"),
        &scenario,
    );
    assert_eq!(comparison.diff.expense_money[&month("2025-08")], 30.0);
    assert_eq!(comparison.diff.income_money[&month("2025-08")], 200.0);
    assert_eq!(comparison.diff.income_money[&month("2025-09")], 0.0);
    assert_eq!(
        comparison.diff.income_by_source_money["side gig"][&month("2025-08")],
        200.0
    );
}

#[test]
fn rate_overrides_apply_to_the_scenario_run() {
    let (rows, _, _) = household();
    let mut scenario = Scenario::new("raise in september");
    scenario.hourly_rate_overrides.insert(month("2025-09"), 2_000);

    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(Some(1_000)),
        &grid("2025-08", "2025-09"),
        &scenario,
    );

    assert_close(comparison.baseline.expense_hours[&month("2025-09")], 11.0);
    assert_close(comparison.scenario.expense_hours[&month("2025-09")], 5.5);
    assert_close(comparison.diff.expense_hours[&month("2025-08")], 0.0);
    assert_close(comparison.diff.expense_hours[&month("2025-09")], -5.5);
    assert_eq!(comparison.diff.expense_money[&month("2025-09")], 0.0);
}

#[test]
fn override_without_a_baseline_rate_still_diffs_hours() {
    let rows = RowSet {
        expenses: vec![Expense::new(5_000, eur(), Frequency::Monthly, date(2025, 1, 1))],
        ..RowSet::default()
    };
    let mut scenario = Scenario::new("start billing hours");
    scenario.hourly_rate_overrides.insert(month("2025-09"), 2_000);

    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(None),
        &grid("2025-08", "2025-09"),
        &scenario,
    );

    assert_eq!(comparison.baseline.expense_hours[&month("2025-09")], None);
    assert_close(comparison.scenario.expense_hours[&month("2025-09")], 2.5);
    assert_close(comparison.diff.expense_hours[&month("2025-09")], 2.5);
    assert_eq!(comparison.diff.expense_hours[&month("2025-08")], None);
}

#[test]
fn added_rows_without_an_id_are_kept() {
    let (rows, _, _) = household();
    let scenario: Scenario = serde_json::from_value(json!({
        "name": "new gym",
        "expenses": [{
            "op": "add",
            "row": {
                "amount_cents": 4_000,
                "currency": "EUR",
                "frequency": "monthly",
                "start_date": "2025-08-01"
            }
        }]
    }))
    .expect("scenario parses");

    assert!(matches!(scenario.expenses[0], RowOp::Add { .. }));
    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(Some(1_000)),
        &grid("2025-08", "2025-08"),
        &scenario,
    );
    assert_eq!(comparison.diff.expense_money[&month("2025-08")], 40.0);
}

#[test]
fn category_scaling_and_budget_replacement() {
    let (rows, _, groceries) = household();
    let scenario: Scenario = serde_json::from_value(json!({
        "name": "frugal month",
        "category_scaling": { groceries.to_string(): 0.5 },
        "budget_allocations": []
    }))
    .expect("scenario parses");

    let comparison = ScenarioEngine::compare(
        &rows,
        &eur_context(Some(1_000)),
        &grid("2025-08", "2025-08"),
        &scenario,
    );
    let august = month("2025-08");

    assert_eq!(comparison.diff.expense_money[&august], -30.0);
    assert_eq!(comparison.diff.budget_money[&august], -300.0);
    assert!(comparison.scenario.budget_variance_by_category_hours.is_empty());
}

fn service_with(rows: RowSet, scenarios: Vec<Scenario>) -> (EvaluationService, Uuid) {
    let user = Uuid::new_v4();
    let mut profile = UserProfile::new(user);
    profile.base_currency = Some(eur());
    profile.static_hourly_rate_cents = Some(1_000);
    let mut data = user_data(profile, rows);
    data.scenarios = scenarios;
    let provider = JsonDataProvider::from_dataset(Dataset {
        users: vec![data],
        ..Dataset::default()
    })
    .expect("valid dataset");
    (EvaluationService::new(Arc::new(provider), EngineSettings::default()), user)
}

#[test]
fn service_evaluates_stored_scenarios() {
    let (rows, streaming, _) = household();
    let mut scenario = Scenario::new("cancel streaming");
    scenario.expenses.push(RowOp::Remove { id: streaming });
    let scenario_id = scenario.id;
    let (service, user) = service_with(rows, vec![scenario]);

    let window = WindowRequest::new(Some(month("2025-08")), Some(month("2025-09")));
    let comparison = service
        .evaluate(user, scenario_id, window, None)
        .expect("scenario evaluates");
    assert_eq!(comparison.months, vec![month("2025-08"), month("2025-09")]);
    assert_eq!(comparison.diff.expense_money[&month("2025-09")], -50.0);

    let missing = Uuid::new_v4();
    match service.evaluate(user, missing, window, None) {
        Err(EngineError::UnknownScenario { scenario, .. }) => assert_eq!(scenario, missing),
        other => panic!("expected unknown scenario, got {other:?}"),
    }
}

#[test]
fn preview_does_not_require_a_stored_scenario() {
    let (rows, _, _) = household();
    let (service, user) = service_with(rows, Vec::new());
    let mut scenario = Scenario::new("sell the dishwasher");
    scenario.objects.push(RowOp::Noop);

    let comparison = service
        .preview(user, &scenario, WindowRequest::new(Some(month("2025-08")), None), None)
        .expect("preview runs");
    assert_eq!(comparison.months.len(), 12);
    assert!(comparison.diff.is_zero());
}

#[test]
fn recurring_rows_stop_at_today_when_no_date_is_given() {
    let (rows, _, _) = household();
    let (service, user) = service_with(rows, Vec::new());
    let future = WindowRequest::new(Some(month("2099-01")), Some(month("2099-02")));

    let undated = service
        .preview(user, &Scenario::new("far ahead"), future, None)
        .expect("preview runs");
    assert!(undated.baseline.expense_money.values().all(|money| *money == 0.0));
    assert!(undated.baseline.income_money.values().all(|money| *money == 0.0));

    let dated = service
        .preview(user, &Scenario::new("far ahead"), future, Some(date(2099, 12, 31)))
        .expect("preview runs");
    assert_eq!(dated.baseline.expense_money[&month("2099-01")], 110.0);
}

#[test]
fn windows_default_to_the_trailing_year() {
    let (service, _) = service_with(RowSet::default(), Vec::new());

    let trailing = service
        .window(WindowRequest::default(), Some(date(2025, 9, 14)))
        .expect("default window");
    assert_eq!(trailing.first(), month("2024-10"));
    assert_eq!(trailing.last(), month("2025-09"));

    let ending = service
        .window(WindowRequest::new(None, Some(month("2025-03"))), None)
        .expect("window ending in march");
    assert_eq!(ending.first(), month("2024-04"));

    let inverted = WindowRequest::new(Some(month("2025-05")), Some(month("2025-01")));
    let inverted = service.window(inverted, None);
    assert!(matches!(inverted, Err(EngineError::InvalidWindow { .. })));
}

#[test]
fn unknown_users_are_reported() {
    let (service, _) = service_with(RowSet::default(), Vec::new());
    let stranger = Uuid::new_v4();
    let result = service.run(stranger, &grid("2025-01", "2025-02"), None);
    assert!(matches!(result, Err(EngineError::UnknownUser(id)) if id == stranger));
}
