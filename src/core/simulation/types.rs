use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use timeledger_domain::{
    Activity, BudgetAllocation, CurrencyCode, Expense, Frequency, Income, MonthKey, Object,
};
use tracing::warn;
use uuid::Uuid;

use crate::core::result::AggregateResult;

use super::diff::AggregateDiff;

/// One edit to a row list. Unknown or malformed ops parse to [`RowOp::Noop`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowOp<R, P> {
    Add { row: R },
    Edit { id: Uuid, patch: P },
    Remove { id: Uuid },
    Noop,
}

impl<R, P> RowOp<R, P>
where
    R: DeserializeOwned,
    P: DeserializeOwned,
{
    /// Parses a free-form op, degrading to `Noop` so one bad entry cannot sink the scenario.
    pub fn parse(entity: &str, value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(op) => op,
            Err(err) => {
                warn!(entity, error = %err, "ignoring malformed scenario op");
                RowOp::Noop
            }
        }
    }
}

impl<R, P> RowOp<R, P> {
    pub fn summary(&self) -> String {
        match self {
            RowOp::Add { .. } => "add".into(),
            RowOp::Edit { id, .. } => format!("edit {}", id),
            RowOp::Remove { id } => format!("remove {}", id),
            RowOp::Noop => "noop".into(),
        }
    }
}

/// Applies a partial update in place.
pub trait RowPatch<R> {
    fn apply_to(&self, row: &mut R);
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

macro_rules! patch_fields {
    ($patch:ident => $row:ident: $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $row.$field = value.clone();
            }
        )+
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IncomePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub source: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<bool>,
}

impl RowPatch<Income> for IncomePatch {
    fn apply_to(&self, row: &mut Income) {
        patch_fields!(self => row: received_at, amount_cents, currency, source, recurring);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpensePatch {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<Uuid>>,
}

impl RowPatch<Expense> for ExpensePatch {
    fn apply_to(&self, row: &mut Expense) {
        patch_fields!(
            self => row:
            name, amount_cents, currency, frequency, start_date, end_date,
            is_active, category_id,
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_life_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_cents_per_month: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_saved_per_month: Option<f64>,
}

impl RowPatch<Object> for ObjectPatch {
    fn apply_to(&self, row: &mut Object) {
        patch_fields!(
            self => row:
            name, category_id, price_cents, currency, purchase_date,
            expected_life_months, maintenance_cents_per_month,
            hours_saved_per_month,
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_cost_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl RowPatch<Activity> for ActivityPatch {
    fn apply_to(&self, row: &mut Activity) {
        patch_fields!(
            self => row:
            name, category_id, duration_minutes, frequency, direct_cost_cents,
            saved_minutes, currency, start_date, end_date, is_active,
        );
    }
}

pub type IncomeOp = RowOp<Income, IncomePatch>;
pub type ExpenseOp = RowOp<Expense, ExpensePatch>;
pub type ObjectOp = RowOp<Object, ObjectPatch>;
pub type ActivityOp = RowOp<Activity, ActivityPatch>;

fn default_scenario_id() -> Uuid {
    Uuid::new_v4()
}

/// A what-if description evaluated against the unmodified rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "ScenarioDocument")]
pub struct Scenario {
    pub id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub hourly_rate_overrides: BTreeMap<MonthKey, i64>,
    pub incomes: Vec<IncomeOp>,
    pub expenses: Vec<ExpenseOp>,
    pub objects: Vec<ObjectOp>,
    pub activities: Vec<ActivityOp>,
    /// Multipliers applied to the money amounts of rows in a category.
    pub category_scaling: BTreeMap<Uuid, f64>,
    /// Replaces every stored allocation when present.
    pub budget_allocations: Option<Vec<BudgetAllocation>>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            notes: None,
            hourly_rate_overrides: BTreeMap::new(),
            incomes: Vec::new(),
            expenses: Vec::new(),
            objects: Vec::new(),
            activities: Vec::new(),
            category_scaling: BTreeMap::new(),
            budget_allocations: None,
        }
    }

    pub fn op_count(&self) -> usize {
        self.incomes.len() + self.expenses.len() + self.objects.len() + self.activities.len()
    }

    /// True when the scenario cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.hourly_rate_overrides.is_empty()
            && self.category_scaling.is_empty()
            && self.budget_allocations.is_none()
            && self.incomes.iter().all(|op| matches!(op, RowOp::Noop))
            && self.expenses.iter().all(|op| matches!(op, RowOp::Noop))
            && self.objects.iter().all(|op| matches!(op, RowOp::Noop))
            && self.activities.iter().all(|op| matches!(op, RowOp::Noop))
    }
}

/// Wire shape of a scenario; op lists stay untyped until each entry is parsed on its own.
#[derive(Debug, Deserialize)]
struct ScenarioDocument {
    #[serde(default = "default_scenario_id")]
    id: Uuid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    hourly_rate_overrides: BTreeMap<MonthKey, i64>,
    #[serde(default)]
    incomes: Vec<Value>,
    #[serde(default)]
    expenses: Vec<Value>,
    #[serde(default)]
    objects: Vec<Value>,
    #[serde(default)]
    activities: Vec<Value>,
    #[serde(default)]
    category_scaling: BTreeMap<Uuid, f64>,
    #[serde(default)]
    budget_allocations: Option<Vec<BudgetAllocation>>,
}

fn parse_ops<R, P>(entity: &str, values: Vec<Value>) -> Vec<RowOp<R, P>>
where
    R: DeserializeOwned,
    P: DeserializeOwned,
{
    values
        .into_iter()
        .map(|value| RowOp::parse(entity, value))
        .collect()
}

impl From<ScenarioDocument> for Scenario {
    fn from(doc: ScenarioDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            notes: doc.notes,
            hourly_rate_overrides: doc.hourly_rate_overrides,
            incomes: parse_ops("income", doc.incomes),
            expenses: parse_ops("expense", doc.expenses),
            objects: parse_ops("object", doc.objects),
            activities: parse_ops("activity", doc.activities),
            category_scaling: doc.category_scaling,
            budget_allocations: doc.budget_allocations,
        }
    }
}

/// Baseline and scenario runs over the same months, plus their difference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioComparison {
    pub months: Vec<MonthKey>,
    pub baseline: AggregateResult,
    pub scenario: AggregateResult,
    pub diff: AggregateDiff,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_ops_degrade_to_noop() {
        let id = Uuid::new_v4();
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "Cut streaming",
            "expenses": [
                { "op": "remove", "id": id },
                { "op": "explode" },
                { "op": "edit", "id": "not-a-uuid", "patch": {} }
            ],
            "hourly_rate_overrides": { "2025-09": 4500 }
        }))
        .unwrap();
        assert_eq!(scenario.expenses.len(), 3);
        assert_eq!(scenario.expenses[0], RowOp::Remove { id });
        assert_eq!(scenario.expenses[1], RowOp::Noop);
        assert_eq!(scenario.expenses[2], RowOp::Noop);
        assert_eq!(scenario.hourly_rate_overrides[&"2025-09".parse().unwrap()], 4_500);
        assert!(!scenario.is_empty());
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let patch: ExpensePatch =
            serde_json::from_value(json!({ "end_date": null, "amount_cents": 100 })).unwrap();
        assert_eq!(patch.end_date, Some(None));
        assert_eq!(patch.category_id, None);

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut expense = Expense::new(50, "EUR".into(), Frequency::Monthly, start)
            .ending(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        patch.apply_to(&mut expense);
        assert_eq!(expense.end_date, None);
        assert_eq!(expense.amount_cents, 100);
    }

    #[test]
    fn empty_document_is_empty_scenario() {
        let scenario: Scenario = serde_json::from_value(json!({})).unwrap();
        assert!(scenario.is_empty());
        assert_eq!(scenario.op_count(), 0);
    }
}
