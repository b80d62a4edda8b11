use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timeledger_domain::{
    Activity, BudgetAllocation, CurrencyCode, Expense, Goal, GoalContribution, HourlyRateEntry,
    Identifiable, Income, Object, RowSet, UserProfile,
};
use tracing::info;
use uuid::Uuid;

use crate::alerts::AlertRuleRecord;
use crate::core::simulation::Scenario;
use crate::currency::{FxBook, FxKey, FxRate, FxTable};
use crate::errors::{EngineError, Result};

use super::DataProvider;

/// Everything stored for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserData {
    pub profile: UserProfile,
    #[serde(flatten)]
    pub rows: RowSet,
    #[serde(default)]
    pub hourly_rates: Vec<HourlyRateEntry>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl UserData {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            rows: RowSet::default(),
            hourly_rates: Vec::new(),
            scenarios: Vec::new(),
        }
    }
}

/// On-disk dataset read by [`JsonDataProvider`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub users: Vec<UserData>,
    #[serde(default)]
    pub fx_rates: Vec<FxRate>,
    #[serde(default)]
    pub alert_rules: Vec<AlertRuleRecord>,
}

impl Dataset {
    /// Checks every row once so the engine can assume well-formed input. All problems
    /// are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut seen_users = HashSet::new();

        for user in &self.users {
            let owner = user.profile.user_id;
            if !seen_users.insert(owner) {
                problems.push(format!("user {} appears more than once", owner));
            }
            if let Some(code) = &user.profile.base_currency {
                check_currency(&mut problems, "profile", owner, code);
            }
            if matches!(user.profile.static_hourly_rate_cents, Some(rate) if rate <= 0) {
                problems.push(format!("profile {}: static hourly rate must be positive", owner));
            }
            validate_rows(&mut problems, &user.rows);
            for entry in &user.hourly_rates {
                if entry.rate_cents <= 0 {
                    problems.push(format!(
                        "user {}: hourly rate for {} must be positive",
                        owner, entry.effective_month
                    ));
                }
            }
        }

        for rate in &self.fx_rates {
            if !(rate.rate.is_finite() && rate.rate > 0.0) {
                problems.push(format!(
                    "fx {}->{} on {}: rate must be positive",
                    rate.base, rate.quote, rate.date
                ));
            }
            if !rate.base.is_well_formed() || !rate.quote.is_well_formed() {
                problems.push(format!("fx {}->{}: malformed currency code", rate.base, rate.quote));
            }
        }

        for rule in &self.alert_rules {
            if !seen_users.contains(&rule.user_id) {
                problems.push(format!("alert rule {}: unknown user {}", rule.id, rule.user_id));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(problems))
        }
    }

    pub fn user(&self, user: Uuid) -> Option<&UserData> {
        self.users.iter().find(|data| data.profile.user_id == user)
    }
}

fn validate_rows(problems: &mut Vec<String>, rows: &RowSet) {
    check_unique(problems, "income", &rows.incomes);
    check_unique(problems, "expense", &rows.expenses);
    check_unique(problems, "object", &rows.objects);
    check_unique(problems, "activity", &rows.activities);
    check_unique(problems, "budget allocation", &rows.budget_allocations);
    check_unique(problems, "goal", &rows.goals);

    for income in &rows.incomes {
        check_currency(problems, "income", income.id, &income.currency);
        check_amount(problems, "income", income.id, income.amount_cents);
    }
    for expense in &rows.expenses {
        check_currency(problems, "expense", expense.id, &expense.currency);
        check_amount(problems, "expense", expense.id, expense.amount_cents);
        check_range(problems, "expense", expense.id, Some(expense.start_date), expense.end_date);
    }
    for object in &rows.objects {
        check_currency(problems, "object", object.id, &object.currency);
        check_amount(problems, "object", object.id, object.price_cents);
        check_amount(problems, "object", object.id, object.maintenance_cents_per_month);
        if !object.hours_saved_per_month.is_finite() || object.hours_saved_per_month < 0.0 {
            problems.push(format!(
                "object {}: hours saved must be a non-negative number",
                object.id
            ));
        }
    }
    for activity in &rows.activities {
        check_currency(problems, "activity", activity.id, &activity.currency);
        check_amount(problems, "activity", activity.id, activity.direct_cost_cents);
        check_range(problems, "activity", activity.id, activity.start_date, activity.end_date);
    }
    for allocation in &rows.budget_allocations {
        check_currency(problems, "budget allocation", allocation.id, &allocation.currency);
        check_amount(problems, "budget allocation", allocation.id, allocation.amount_cents);
        check_range(
            problems,
            "budget allocation",
            allocation.id,
            Some(allocation.period_start),
            Some(allocation.period_end),
        );
    }

    let goals: HashSet<Uuid> = rows.goals.iter().map(|goal| goal.id).collect();
    for contribution in &rows.goal_contributions {
        if !goals.contains(&contribution.goal_id) {
            problems.push(format!(
                "goal contribution {}: unknown goal {}",
                contribution.id, contribution.goal_id
            ));
        }
        if contribution.amount_cents.is_some() {
            check_currency(problems, "goal contribution", contribution.id, &contribution.currency);
        }
    }
}

fn check_unique<R: Identifiable>(problems: &mut Vec<String>, entity: &str, rows: &[R]) {
    let mut seen = HashSet::new();
    for row in rows {
        if !seen.insert(row.id()) {
            problems.push(format!("{} {}: duplicate id", entity, row.id()));
        }
    }
}

fn check_currency(problems: &mut Vec<String>, entity: &str, id: Uuid, code: &CurrencyCode) {
    if !code.is_well_formed() {
        problems.push(format!("{} {}: unknown currency code `{}`", entity, id, code));
    }
}

fn check_amount(problems: &mut Vec<String>, entity: &str, id: Uuid, cents: i64) {
    if cents < 0 {
        problems.push(format!("{} {}: negative amount {}", entity, id, cents));
    }
}

fn check_range(
    problems: &mut Vec<String>,
    entity: &str,
    id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            problems.push(format!("{} {}: ends {} before it starts {}", entity, id, end, start));
        }
    }
}

/// In-memory provider backed by a validated [`Dataset`].
#[derive(Debug, Clone)]
pub struct JsonDataProvider {
    dataset: Dataset,
    index: HashMap<Uuid, usize>,
}

impl JsonDataProvider {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let dataset: Dataset = serde_json::from_str(&data)?;
        info!(
            path = %path.display(),
            users = dataset.users.len(),
            fx_rates = dataset.fx_rates.len(),
            "loaded dataset"
        );
        Self::from_dataset(dataset)
    }

    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        dataset.validate()?;
        let index = dataset
            .users
            .iter()
            .enumerate()
            .map(|(position, user)| (user.profile.user_id, position))
            .collect();
        Ok(Self { dataset, index })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn user(&self, user: Uuid) -> Result<&UserData> {
        self.index
            .get(&user)
            .and_then(|position| self.dataset.users.get(*position))
            .ok_or(EngineError::UnknownUser(user))
    }

    fn book(&self, anchor: &CurrencyCode) -> FxBook {
        let mut book = FxBook::new(anchor.clone());
        for rate in &self.dataset.fx_rates {
            book.add_rate(rate);
        }
        book
    }
}

impl DataProvider for JsonDataProvider {
    fn users(&self) -> Result<Vec<Uuid>> {
        Ok(self.dataset.users.iter().map(|user| user.profile.user_id).collect())
    }

    fn user_profile(&self, user: Uuid) -> Result<Option<UserProfile>> {
        Ok(self
            .index
            .get(&user)
            .and_then(|position| self.dataset.users.get(*position))
            .map(|data| data.profile.clone()))
    }

    fn incomes(&self, user: Uuid) -> Result<Vec<Income>> {
        Ok(self.user(user)?.rows.incomes.clone())
    }

    fn expenses(&self, user: Uuid) -> Result<Vec<Expense>> {
        Ok(self.user(user)?.rows.expenses.clone())
    }

    fn objects(&self, user: Uuid) -> Result<Vec<Object>> {
        Ok(self.user(user)?.rows.objects.clone())
    }

    fn activities(&self, user: Uuid) -> Result<Vec<Activity>> {
        Ok(self.user(user)?.rows.activities.clone())
    }

    fn budget_allocations(&self, user: Uuid) -> Result<Vec<BudgetAllocation>> {
        Ok(self.user(user)?.rows.budget_allocations.clone())
    }

    fn goals(&self, user: Uuid) -> Result<Vec<Goal>> {
        Ok(self.user(user)?.rows.goals.clone())
    }

    fn goal_contributions(&self, user: Uuid) -> Result<Vec<GoalContribution>> {
        Ok(self.user(user)?.rows.goal_contributions.clone())
    }

    fn rows(&self, user: Uuid) -> Result<RowSet> {
        Ok(self.user(user)?.rows.clone())
    }

    fn fx_rate(
        &self,
        date: NaiveDate,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Option<f64>> {
        let book = self.book(base);
        Ok(book.lookup(quote, date))
    }

    fn fx_rates(&self, anchor: &CurrencyCode, keys: &BTreeSet<FxKey>) -> Result<FxTable> {
        Ok(self.book(anchor).table_for(keys))
    }

    fn hourly_rate_timeline(&self, user: Uuid) -> Result<Vec<HourlyRateEntry>> {
        let mut timeline = self.user(user)?.hourly_rates.clone();
        timeline.sort_by_key(|entry| entry.effective_month);
        Ok(timeline)
    }

    fn scenario(&self, user: Uuid, scenario: Uuid) -> Result<Option<Scenario>> {
        Ok(self
            .user(user)?
            .scenarios
            .iter()
            .find(|candidate| candidate.id == scenario)
            .cloned())
    }

    fn active_alert_rules(&self) -> Result<Vec<AlertRuleRecord>> {
        Ok(self
            .dataset
            .alert_rules
            .iter()
            .filter(|rule| rule.active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeledger_domain::Frequency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> (Dataset, Uuid) {
        let user = Uuid::new_v4();
        let mut data = UserData::new(UserProfile::new(user));
        data.rows
            .expenses
            .push(Expense::new(5_999, "EUR".into(), Frequency::Monthly, date(2025, 8, 1)));
        let dataset = Dataset {
            users: vec![data],
            fx_rates: vec![FxRate::new("EUR", "RON", date(2025, 8, 1), 4.97)],
            alert_rules: Vec::new(),
        };
        (dataset, user)
    }

    #[test]
    fn validation_collects_every_problem() {
        let (mut dataset, _) = dataset();
        let rows = &mut dataset.users[0].rows;
        rows.expenses[0].amount_cents = -1;
        rows.expenses[0].end_date = Some(date(2025, 1, 1));
        rows.incomes
            .push(Income::new(date(2025, 8, 1), 100, CurrencyCode::new("euro")));
        rows.goal_contributions
            .push(GoalContribution::hours(Uuid::new_v4(), date(2025, 8, 1), 2.0));

        match JsonDataProvider::from_dataset(dataset) {
            Err(EngineError::Validation(problems)) => assert_eq!(problems.len(), 4),
            other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_user_is_an_error() {
        let (dataset, _) = dataset();
        let provider = JsonDataProvider::from_dataset(dataset).unwrap();
        assert!(matches!(
            provider.rows(Uuid::new_v4()),
            Err(EngineError::UnknownUser(_))
        ));
        assert_eq!(provider.user_profile(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn fx_lookup_uses_latest_rate_not_after_date() {
        let (dataset, _) = dataset();
        let provider = JsonDataProvider::from_dataset(dataset).unwrap();
        let eur = CurrencyCode::new("EUR");
        let ron = CurrencyCode::new("RON");
        assert_eq!(provider.fx_rate(date(2025, 8, 15), &eur, &ron).unwrap(), Some(4.97));
        assert_eq!(provider.fx_rate(date(2025, 7, 31), &eur, &ron).unwrap(), None);
    }

    #[test]
    fn rows_round_trip_through_json() {
        let (dataset, user) = dataset();
        let json = serde_json::to_string(&dataset).unwrap();
        let restored: Dataset = serde_json::from_str(&json).unwrap();
        let provider = JsonDataProvider::from_dataset(restored).unwrap();
        assert_eq!(provider.rows(user).unwrap().expenses[0].amount_cents, 5_999);
    }
}
