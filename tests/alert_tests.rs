mod common;

use std::sync::Arc;

use common::{date, eur, month, user_data};
use serde_json::json;
use timeledger::alerts::{
    AlertEvaluator, AlertNotification, AlertRuleRecord, AlertRunSummary, DeliveryOutcome,
    NotificationSink, NotifyError, RecordingSink,
};
use timeledger::config::EngineSettings;
use timeledger::core::services::EvaluationService;
use timeledger::domain::{
    BudgetAllocation, Expense, Frequency, Goal, GoalContribution, Object, RowSet, UserProfile,
};
use timeledger::provider::{Dataset, JsonDataProvider};
use uuid::Uuid;

struct Fixture {
    service: EvaluationService,
    burn_rule: Uuid,
}

fn fixture() -> Fixture {
    let user = Uuid::new_v4();
    let mut profile = UserProfile::new(user);
    profile.base_currency = Some(eur());
    profile.static_hourly_rate_cents = Some(1_000);

    let groceries = Uuid::new_v4();
    let mut bike = Object::new("cargo bike", 12_000, eur(), date(2025, 1, 10));
    bike.hours_saved_per_month = 4.0;
    let goal = Goal::hours("read twelve books", 5.0);
    let rows = RowSet {
        expenses: vec![
            Expense::new(20_000, eur(), Frequency::Monthly, date(2025, 1, 1))
                .with_category(groceries),
        ],
        objects: vec![bike.clone()],
        budget_allocations: vec![BudgetAllocation::new(
            groceries,
            10_000,
            eur(),
            date(2025, 9, 1),
            date(2025, 9, 30),
        )],
        goal_contributions: vec![GoalContribution::hours(goal.id, date(2025, 9, 2), 6.0)],
        goals: vec![goal.clone()],
        ..RowSet::default()
    };

    let burn = AlertRuleRecord::new(user, "time_burn_threshold", json!({ "max_hours": 10 }));
    let mut paused = AlertRuleRecord::new(user, "time_burn_threshold", json!({ "max_hours": 1 }));
    paused.active = false;
    let rules = vec![
        burn.clone(),
        AlertRuleRecord::new(user, "budget_overrun", json!({ "category_id": groceries })),
        AlertRuleRecord::new(user, "object_breakeven", json!({ "object_id": bike.id })),
        AlertRuleRecord::new(user, "goal_reached", json!({ "goal_id": goal.id })),
        AlertRuleRecord::new(user, "sunspots", json!({})),
        paused,
    ];

    let provider = JsonDataProvider::from_dataset(Dataset {
        users: vec![user_data(profile, rows)],
        alert_rules: rules,
        ..Dataset::default()
    })
    .expect("valid dataset");
    Fixture {
        service: EvaluationService::new(Arc::new(provider), EngineSettings::default()),
        burn_rule: burn.id,
    }
}

#[test]
fn supported_rules_fire_once_per_month() {
    let fixture = fixture();
    let evaluator = AlertEvaluator::new(&fixture.service);
    let sink = RecordingSink::new();
    let september = month("2025-09");

    let first = evaluator.run(september, &sink).expect("alert run");
    assert_eq!(
        first,
        AlertRunSummary {
            evaluated: 4,
            fired: 4,
            suppressed: 0,
            skipped: 1,
            failed: 0,
        }
    );

    let second = evaluator.run(september, &sink).expect("alert run");
    assert_eq!(second.fired, 0);
    assert_eq!(second.suppressed, 4);
    assert_eq!(sink.delivered().len(), 4);

    let burn = sink
        .delivered()
        .into_iter()
        .find(|notification| notification.rule_id == fixture.burn_rule)
        .expect("burn alert delivered");
    assert_eq!(burn.dedupe_key, format!("{}:2025-09", fixture.burn_rule));
    assert_eq!(burn.value, Some(17.0));
}

#[test]
fn a_new_month_fires_again() {
    let fixture = fixture();
    let evaluator = AlertEvaluator::new(&fixture.service);
    let sink = RecordingSink::new();

    evaluator.run(month("2025-09"), &sink).expect("alert run");
    let october = evaluator.run(month("2025-10"), &sink).expect("alert run");

    // no allocation covers October, so the overrun rule has nothing to compare
    assert_eq!(october.fired, 3);
    assert_eq!(october.suppressed, 0);
}

struct RejectingSink;

impl NotificationSink for RejectingSink {
    fn deliver(&self, _notification: &AlertNotification) -> Result<DeliveryOutcome, NotifyError> {
        Err(NotifyError::Rejected("mailbox full".into()))
    }
}

#[test]
fn delivery_failures_are_counted_not_raised() {
    let fixture = fixture();
    let summary = AlertEvaluator::new(&fixture.service)
        .run(month("2025-09"), &RejectingSink)
        .expect("run completes");
    assert_eq!(summary.failed, 4);
    assert_eq!(summary.fired, 0);
    assert_eq!(summary.skipped, 1);
}
