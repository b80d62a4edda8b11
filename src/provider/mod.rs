pub mod json_provider;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use timeledger_domain::{
    Activity, BudgetAllocation, CurrencyCode, Expense, Goal, GoalContribution, HourlyRateEntry,
    Income, Object, RowSet, UserProfile,
};
use uuid::Uuid;

use crate::alerts::AlertRuleRecord;
use crate::core::simulation::Scenario;
use crate::currency::{FxKey, FxTable};
use crate::errors::Result;

/// Read-only source of everything the engine evaluates. Rows returned here are
/// expected to be well formed; implementations validate at load time.
pub trait DataProvider: Send + Sync {
    fn users(&self) -> Result<Vec<Uuid>>;
    fn user_profile(&self, user: Uuid) -> Result<Option<UserProfile>>;

    fn incomes(&self, user: Uuid) -> Result<Vec<Income>>;
    fn expenses(&self, user: Uuid) -> Result<Vec<Expense>>;
    fn objects(&self, user: Uuid) -> Result<Vec<Object>>;
    fn activities(&self, user: Uuid) -> Result<Vec<Activity>>;
    fn budget_allocations(&self, user: Uuid) -> Result<Vec<BudgetAllocation>>;
    fn goals(&self, user: Uuid) -> Result<Vec<Goal>>;
    fn goal_contributions(&self, user: Uuid) -> Result<Vec<GoalContribution>>;

    /// Latest `1 base = rate quote` observation dated on or before `date`.
    fn fx_rate(
        &self,
        date: NaiveDate,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Option<f64>>;

    fn hourly_rate_timeline(&self, user: Uuid) -> Result<Vec<HourlyRateEntry>>;
    fn scenario(&self, user: Uuid, scenario: Uuid) -> Result<Option<Scenario>>;
    fn active_alert_rules(&self) -> Result<Vec<AlertRuleRecord>>;

    /// Every row kind for one user.
    fn rows(&self, user: Uuid) -> Result<RowSet> {
        Ok(RowSet {
            incomes: self.incomes(user)?,
            expenses: self.expenses(user)?,
            objects: self.objects(user)?,
            activities: self.activities(user)?,
            budget_allocations: self.budget_allocations(user)?,
            goals: self.goals(user)?,
            goal_contributions: self.goal_contributions(user)?,
        })
    }

    /// Resolves a batch of anchor legs. The default asks [`DataProvider::fx_rate`] once per
    /// key; providers holding the full history should answer in one pass instead.
    fn fx_rates(&self, anchor: &CurrencyCode, keys: &BTreeSet<FxKey>) -> Result<FxTable> {
        let mut table = FxTable::new(anchor.clone());
        for key in keys {
            let rate = self.fx_rate(key.date, anchor, &key.currency)?;
            table.insert(key.clone(), rate);
        }
        Ok(table)
    }
}

pub use json_provider::{Dataset, JsonDataProvider, UserData};
