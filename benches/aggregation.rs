use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use timeledger::calendar::MonthGrid;
use timeledger::core::prefetch;
use timeledger::core::simulation::{RowOp, Scenario, ScenarioEngine};
use timeledger::currency::{FxBook, FxRate};
use timeledger::domain::{
    Activity, BudgetAllocation, CurrencyCode, Expense, Frequency, Income, MonthKey, Object, RowSet,
};
use timeledger::{EngineContext, TimeValueEngine};
use uuid::Uuid;

const FREQUENCIES: [Frequency; 4] = [
    Frequency::Once,
    Frequency::Weekly,
    Frequency::Monthly,
    Frequency::Yearly,
];

fn build_sample_rows(row_count: usize) -> RowSet {
    let start_date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let categories: Vec<Uuid> = (0..12).map(|_| Uuid::new_v4()).collect();
    let currencies = [CurrencyCode::new("EUR"), CurrencyCode::new("RON")];
    let mut rows = RowSet::default();

    for idx in 0..row_count {
        let day = start_date + Duration::days((idx % 730) as i64);
        let currency = currencies[idx % 2].clone();
        let category = categories[idx % categories.len()];
        match idx % 4 {
            0 => rows.incomes.push(
                Income::new(day, 150_000 + (idx % 100) as i64, currency)
                    .with_source(format!("client {}", idx % 7)),
            ),
            1 => rows.expenses.push(
                Expense::new(2_000 + (idx % 500) as i64, currency, FREQUENCIES[idx % 4], day)
                    .with_category(category),
            ),
            2 => {
                let frequency = FREQUENCIES[(idx / 4) % 4];
                let mut activity = Activity::new(format!("activity {idx}"), frequency, currency);
                activity.category_id = Some(category);
                activity.duration_minutes = 30;
                activity.direct_cost_cents = 300;
                activity.saved_minutes = 45;
                activity.start_date = Some(day);
                rows.activities.push(activity);
            }
            _ => {
                let mut object = Object::new(format!("object {idx}"), 40_000, currency, day);
                object.category_id = Some(category);
                object.maintenance_cents_per_month = 500;
                object.hours_saved_per_month = 1.5;
                object.expected_life_months = 36;
                rows.objects.push(object);
            }
        }
    }
    for category in &categories {
        rows.budget_allocations.push(BudgetAllocation::new(
            *category,
            120_000,
            CurrencyCode::new("EUR"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        ));
    }
    rows
}

fn sample_context(rows: &RowSet, grid: &MonthGrid) -> EngineContext {
    let mut book = FxBook::new(CurrencyCode::new("EUR"));
    let mut day = NaiveDate::from_ymd_opt(2022, 12, 1).unwrap();
    while day <= grid.end_date() {
        book.add_rate(&FxRate::new("EUR", "RON", day, 4.95));
        day += Duration::days(7);
    }
    let ctx = EngineContext::new(CurrencyCode::new("EUR")).with_static_rate(Some(2_500));
    let keys = prefetch::fx_keys([rows], &ctx, grid);
    let table = book.table_for(&keys);
    ctx.with_fx_table(table)
}

fn month(raw: &str) -> MonthKey {
    raw.parse().unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let rows = build_sample_rows(black_box(10_000));
    let grid = MonthGrid::new(month("2024-01"), month("2024-12")).unwrap();
    let ctx = sample_context(&rows, &grid);

    c.bench_function("prefetch_keys_10k", |b| {
        b.iter(|| {
            let keys = prefetch::fx_keys([&rows], &ctx, &grid);
            black_box(keys);
        })
    });

    c.bench_function("aggregate_10k_12m", |b| {
        b.iter(|| {
            let result = TimeValueEngine::run(&rows, &ctx, &grid);
            black_box(result);
        })
    });
}

fn bench_scenarios(c: &mut Criterion) {
    let rows = build_sample_rows(black_box(10_000));
    let grid = MonthGrid::new(month("2024-01"), month("2024-12")).unwrap();
    let ctx = sample_context(&rows, &grid);

    let mut scenario = Scenario::new("benchmark");
    for expense in rows.expenses.iter().step_by(10) {
        scenario.expenses.push(RowOp::Remove { id: expense.id });
    }
    scenario.hourly_rate_overrides.insert(month("2024-06"), 3_000);

    c.bench_function("scenario_compare_10k_12m", |b| {
        b.iter(|| {
            let comparison = ScenarioEngine::compare(&rows, &ctx, &grid, &scenario);
            black_box(comparison);
        })
    });
}

criterion_group!(benches, bench_pipeline, bench_scenarios);
criterion_main!(benches);
