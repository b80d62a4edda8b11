//! Raw rows supplied by the data provider. The engine only ever reads these.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{BelongsToCategory, CurrencyCode, Frequency, Identifiable};
use crate::month::MonthKey;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Income {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub received_at: NaiveDate,
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Recurring income repeats monthly from `received_at`.
    #[serde(default)]
    pub recurring: bool,
}

impl Income {
    pub fn new(received_at: NaiveDate, amount_cents: i64, currency: CurrencyCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at,
            amount_cents,
            currency,
            source: None,
            recurring: false,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn recurring(mut self) -> Self {
        self.recurring = true;
        self
    }

    pub fn frequency(&self) -> Frequency {
        if self.recurring {
            Frequency::Monthly
        } else {
            Frequency::Once
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
}

impl Expense {
    pub fn new(
        amount_cents: i64,
        currency: CurrencyCode,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            amount_cents,
            currency,
            frequency,
            start_date,
            end_date: None,
            is_active: true,
            category_id: None,
        }
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// A depreciable possession that costs money up front and may save time every month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Object {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub price_cents: i64,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub purchase_date: NaiveDate,
    /// Zero means the useful life is unknown and maintenance never stops.
    #[serde(default)]
    pub expected_life_months: u32,
    #[serde(default)]
    pub maintenance_cents_per_month: i64,
    #[serde(default)]
    pub hours_saved_per_month: f64,
}

impl Object {
    pub fn new(
        name: impl Into<String>,
        price_cents: i64,
        currency: CurrencyCode,
        purchase_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category_id: None,
            price_cents,
            currency,
            purchase_date,
            expected_life_months: 0,
            maintenance_cents_per_month: 0,
            hours_saved_per_month: 0.0,
        }
    }

    pub fn purchase_month(&self) -> MonthKey {
        MonthKey::from_date(self.purchase_date)
    }

    /// Whether the object is still within its useful life during `month`.
    pub fn in_service(&self, month: MonthKey) -> bool {
        let age = month.months_since(self.purchase_month());
        age >= 0 && (self.expected_life_months == 0 || age < self.expected_life_months as i64)
    }
}

/// A repeated activity that consumes time and money but may save time elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub direct_cost_cents: i64,
    #[serde(default)]
    pub saved_minutes: u32,
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Defaults to the first day of the evaluated window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Activity {
    pub fn new(name: impl Into<String>, frequency: Frequency, currency: CurrencyCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category_id: None,
            duration_minutes: 0,
            frequency,
            direct_cost_cents: 0,
            saved_minutes: 0,
            currency,
            start_date: None,
            end_date: None,
            is_active: true,
        }
    }

    pub fn saved_hours_per_occurrence(&self) -> f64 {
        self.saved_minutes as f64 / 60.0
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes as f64 / 60.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetAllocation {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub category_id: Uuid,
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl BudgetAllocation {
    pub fn new(
        category_id: Uuid,
        amount_cents: i64,
        currency: CurrencyCode,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            amount_cents,
            currency,
            period_start,
            period_end,
        }
    }

    pub fn first_month(&self) -> MonthKey {
        MonthKey::from_date(self.period_start)
    }

    pub fn last_month(&self) -> MonthKey {
        MonthKey::from_date(self.period_end)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalTargetType {
    Hours,
    Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub target_type: GoalTargetType,
    /// Hours for hour goals, base-currency minor units for money goals.
    pub target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

impl Goal {
    pub fn hours(name: impl Into<String>, target_hours: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_type: GoalTargetType::Hours,
            target: target_hours,
            target_date: None,
        }
    }

    pub fn money(name: impl Into<String>, target_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_type: GoalTargetType::Money,
            target: target_cents as f64,
            target_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalContribution {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub goal_id: Uuid,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub currency: CurrencyCode,
}

impl GoalContribution {
    pub fn hours(goal_id: Uuid, date: NaiveDate, hours: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal_id,
            date,
            hours: Some(hours),
            amount_cents: None,
            currency: CurrencyCode::default(),
        }
    }

    pub fn money(
        goal_id: Uuid,
        date: NaiveDate,
        amount_cents: i64,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal_id,
            date,
            hours: None,
            amount_cents: Some(amount_cents),
            currency,
        }
    }
}

/// One step of a user's hourly-rate history, in base-currency minor units per hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyRateEntry {
    pub effective_month: MonthKey,
    pub rate_cents: i64,
}

/// Per-user engine preferences held by the data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_hourly_rate_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implied_salary: Option<bool>,
}

impl UserProfile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            base_currency: None,
            static_hourly_rate_cents: None,
            implied_salary: None,
        }
    }
}

/// Every row kind the engine consumes for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RowSet {
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub budget_allocations: Vec<BudgetAllocation>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub goal_contributions: Vec<GoalContribution>,
}

impl RowSet {
    pub fn row_count(&self) -> usize {
        self.incomes.len()
            + self.expenses.len()
            + self.objects.len()
            + self.activities.len()
            + self.budget_allocations.len()
            + self.goals.len()
            + self.goal_contributions.len()
    }
}

macro_rules! identifiable {
    ($($row:ty),* $(,)?) => {
        $(impl Identifiable for $row {
            fn id(&self) -> Uuid {
                self.id
            }
        })*
    };
}

identifiable!(
    Income,
    Expense,
    Object,
    Activity,
    BudgetAllocation,
    Goal,
    GoalContribution
);

impl BelongsToCategory for Expense {
    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

impl BelongsToCategory for Object {
    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

impl BelongsToCategory for Activity {
    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

impl BelongsToCategory for BudgetAllocation {
    fn category_id(&self) -> Option<Uuid> {
        Some(self.category_id)
    }
}
