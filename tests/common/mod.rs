#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;
use timeledger::calendar::MonthGrid;
use timeledger::core::prefetch;
use timeledger::currency::{FxBook, FxRate};
use timeledger::domain::{CurrencyCode, MonthKey, RowSet, UserProfile};
use timeledger::provider::{Dataset, UserData};
use timeledger::EngineContext;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Observations shared by the FX-dependent tests, quoted against EUR.
pub static FX_FIXTURE: Lazy<Vec<FxRate>> = Lazy::new(|| {
    vec![
        FxRate::new("EUR", "RON", date(2025, 8, 1), 4.97),
        FxRate::new("EUR", "RON", date(2025, 9, 1), 5.00),
        FxRate::new("EUR", "USD", date(2025, 1, 1), 1.25),
        FxRate::new("GBP", "EUR", date(2025, 1, 1), 1.20),
    ]
});

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn month(raw: &str) -> MonthKey {
    raw.parse().expect("valid test month")
}

pub fn grid(from: &str, to: &str) -> MonthGrid {
    MonthGrid::new(month(from), month(to)).expect("valid test window")
}

pub fn eur() -> CurrencyCode {
    CurrencyCode::new("EUR")
}

/// EUR context with a flat hourly rate and no FX.
pub fn eur_context(rate_cents: Option<i64>) -> EngineContext {
    EngineContext::new(eur()).with_static_rate(rate_cents)
}

pub fn fx_book() -> FxBook {
    let mut book = FxBook::new(eur());
    for rate in FX_FIXTURE.iter() {
        book.add_rate(rate);
    }
    book
}

/// Attaches the FX fixture, prefetched for exactly the conversions `rows` need.
pub fn with_fixture_fx(ctx: EngineContext, rows: &RowSet, grid: &MonthGrid) -> EngineContext {
    let keys = prefetch::fx_keys([rows], &ctx, grid);
    let table = fx_book().table_for(&keys);
    ctx.with_fx_table(table)
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let value = actual.unwrap_or_else(|| panic!("expected {expected}, got None"));
    assert!(
        (value - expected).abs() < 1e-6,
        "expected {expected}, got {value}"
    );
}

pub fn user_data(profile: UserProfile, rows: RowSet) -> UserData {
    let mut data = UserData::new(profile);
    data.rows = rows;
    data
}

/// Writes `dataset` into a fresh temp dir and returns the file path.
pub fn write_dataset(dataset: &Dataset) -> PathBuf {
    let dir = temp_dir();
    let path = dir.join("dataset.json");
    let json = serde_json::to_string_pretty(dataset).expect("serialize dataset");
    std::fs::write(&path, json).expect("write dataset");
    path
}

/// Unique directory that outlives the calling test.
pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}
