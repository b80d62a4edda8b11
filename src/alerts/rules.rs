use serde::{Deserialize, Serialize};
use serde_json::Value;
use timeledger_domain::MonthKey;
use tracing::warn;
use uuid::Uuid;

use crate::core::result::{AggregateResult, GoalStatus};

fn default_true() -> bool {
    true
}

/// An alert rule as stored; `config` is free-form until parsed for its `rule_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRuleRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rule_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl AlertRuleRecord {
    pub fn new(user_id: Uuid, rule_type: impl Into<String>, config: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: None,
            rule_type: rule_type.into(),
            config,
            active: true,
        }
    }

    pub fn condition(&self) -> AlertCondition {
        AlertCondition::parse(&self.rule_type, &self.config)
    }

    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.rule_type.clone())
    }
}

fn default_tolerance() -> f64 {
    0.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeBurnThreshold {
    pub max_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BudgetOverrun {
    /// Whole budget when absent.
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default = "default_tolerance")]
    pub tolerance_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectBreakeven {
    pub object_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoalReached {
    pub goal_id: Uuid,
}

/// Closed set of rule kinds the evaluator understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertCondition {
    TimeBurnThreshold(TimeBurnThreshold),
    BudgetOverrun(BudgetOverrun),
    ObjectBreakeven(ObjectBreakeven),
    GoalReached(GoalReached),
    Unsupported { rule_type: String, reason: String },
}

/// What a rule saw when it fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertFinding {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl AlertCondition {
    pub fn parse(rule_type: &str, config: &Value) -> Self {
        let parsed = match rule_type {
            "time_burn_threshold" => from_config(config).map(Self::TimeBurnThreshold),
            "budget_overrun" => from_config(config).map(Self::BudgetOverrun),
            "object_breakeven" => from_config(config).map(Self::ObjectBreakeven),
            "goal_reached" => from_config(config).map(Self::GoalReached),
            other => Err(format!("unknown rule type `{}`", other)),
        };
        parsed.unwrap_or_else(|reason| {
            warn!(rule_type, %reason, "unsupported alert rule configuration");
            Self::Unsupported {
                rule_type: rule_type.to_string(),
                reason,
            }
        })
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }

    /// Tests the rule against a single-month run. Unknown hours never fire.
    pub fn check(&self, result: &AggregateResult, month: MonthKey) -> Option<AlertFinding> {
        match self {
            Self::TimeBurnThreshold(rule) => {
                let burn = result.burn_for(month)?;
                (burn > rule.max_hours).then(|| AlertFinding {
                    message: format!(
                        "time burn {:.1}h in {} exceeds {:.1}h",
                        burn, month, rule.max_hours
                    ),
                    value: Some(burn),
                })
            }
            Self::BudgetOverrun(rule) => {
                let variance = match rule.category_id {
                    Some(category) => result
                        .budget_variance_by_category_hours
                        .get(&category.to_string())?
                        .get(&month)
                        .copied()
                        .flatten()?,
                    None => result
                        .budget_variance_hours_by_month
                        .get(&month)
                        .copied()
                        .flatten()?,
                };
                (variance < -rule.tolerance_hours).then(|| AlertFinding {
                    message: format!("budget overrun of {:.1}h in {}", -variance, month),
                    value: Some(variance),
                })
            }
            Self::ObjectBreakeven(rule) => {
                let metrics = result.object(rule.object_id)?;
                metrics.breakeven_reached.then(|| AlertFinding {
                    message: format!("{} has paid back its cost in hours", metrics.name),
                    value: metrics.lifetime_roi_hours,
                })
            }
            Self::GoalReached(rule) => {
                let goal = result.goal(rule.goal_id)?;
                (goal.status == GoalStatus::Reached).then(|| AlertFinding {
                    message: format!("goal `{}` reached", goal.name),
                    value: Some(goal.progress),
                })
            }
            Self::Unsupported { .. } => None,
        }
    }
}

fn from_config<T: serde::de::DeserializeOwned>(config: &Value) -> Result<T, String> {
    serde_json::from_value(config.clone()).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn month() -> MonthKey {
        "2025-09".parse().unwrap()
    }

    #[test]
    fn malformed_config_is_unsupported() {
        assert!(!AlertCondition::parse("time_burn_threshold", &json!({ "max": 3 })).is_supported());
        assert!(!AlertCondition::parse("sunspots", &json!({})).is_supported());
        assert_eq!(
            AlertCondition::parse("budget_overrun", &json!({})),
            AlertCondition::BudgetOverrun(BudgetOverrun {
                category_id: None,
                tolerance_hours: 0.0
            })
        );
    }

    #[test]
    fn burn_threshold_fires_above_limit_only() {
        let mut result = AggregateResult::default();
        result.time_burn_net.insert(month(), Some(12.5));
        let rule = AlertCondition::parse("time_burn_threshold", &json!({ "max_hours": 10 }));
        assert_eq!(rule.check(&result, month()).and_then(|finding| finding.value), Some(12.5));

        result.time_burn_net.insert(month(), None);
        assert_eq!(rule.check(&result, month()), None);
    }

    #[test]
    fn overrun_respects_tolerance() {
        let mut result = AggregateResult::default();
        result.budget_variance_hours_by_month.insert(month(), Some(-1.5));
        let lenient = AlertCondition::parse("budget_overrun", &json!({ "tolerance_hours": 2.0 }));
        let strict = AlertCondition::parse("budget_overrun", &json!({}));
        assert!(lenient.check(&result, month()).is_none());
        assert!(strict.check(&result, month()).is_some());
    }
}
