use std::collections::HashSet;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use timeledger_domain::MonthKey;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::MonthGrid;
use crate::core::services::EvaluationService;

use super::rules::{AlertFinding, AlertRuleRecord};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// A fired rule, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub rule_id: Uuid,
    pub user_id: Uuid,
    pub rule_type: String,
    pub month: MonthKey,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub dedupe_key: String,
}

impl AlertNotification {
    fn new(rule: &AlertRuleRecord, month: MonthKey, finding: AlertFinding) -> Self {
        Self {
            rule_id: rule.id,
            user_id: rule.user_id,
            rule_type: rule.rule_type.clone(),
            month,
            message: finding.message,
            value: finding.value,
            dedupe_key: dedupe_key(rule.id, month),
        }
    }
}

/// `<rule_id>:<YYYY-MM>`; a rule fires at most once per month.
pub fn dedupe_key(rule_id: Uuid, month: MonthKey) -> String {
    format!("{}:{}", rule_id, month)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The sink has already seen this dedupe key.
    Suppressed,
}

/// Outbound delivery collaborator (web socket, email, ...).
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &AlertNotification) -> Result<DeliveryOutcome, NotifyError>;
}

/// Keeps delivered notifications in memory and suppresses repeated dedupe keys.
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<RecordingState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    seen: HashSet<String>,
    delivered: Vec<AlertNotification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<AlertNotification> {
        self.state
            .lock()
            .map(|state| state.delivered.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &AlertNotification) -> Result<DeliveryOutcome, NotifyError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| NotifyError::Unavailable("recording sink poisoned".into()))?;
        if !state.seen.insert(notification.dedupe_key.clone()) {
            return Ok(DeliveryOutcome::Suppressed);
        }
        state.delivered.push(notification.clone());
        Ok(DeliveryOutcome::Delivered)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertRunSummary {
    pub evaluated: usize,
    pub fired: usize,
    pub suppressed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Tests every active rule against a single-month run of its user's data.
pub struct AlertEvaluator<'a> {
    service: &'a EvaluationService,
}

impl<'a> AlertEvaluator<'a> {
    pub fn new(service: &'a EvaluationService) -> Self {
        Self { service }
    }

    /// One rule failing, whether in parsing, evaluation or delivery, never stops the
    /// rest of the run.
    pub fn run(
        &self,
        month: MonthKey,
        sink: &dyn NotificationSink,
    ) -> crate::Result<AlertRunSummary> {
        let rules = self.service.provider().active_alert_rules()?;
        let grid = MonthGrid::single(month);
        let as_of = Some(month.last_day());
        let mut summary = AlertRunSummary::default();

        for rule in &rules {
            let condition = rule.condition();
            if !condition.is_supported() {
                summary.skipped += 1;
                continue;
            }
            summary.evaluated += 1;

            let result = match self.service.run(rule.user_id, &grid, as_of) {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        rule = %rule.id,
                        user = %rule.user_id,
                        error = %err,
                        "alert evaluation failed"
                    );
                    summary.failed += 1;
                    continue;
                }
            };
            let Some(finding) = condition.check(&result, month) else {
                debug!(rule = %rule.id, "alert condition not met");
                continue;
            };

            let notification = AlertNotification::new(rule, month, finding);
            match sink.deliver(&notification) {
                Ok(DeliveryOutcome::Delivered) => {
                    info!(rule = %rule.id, key = %notification.dedupe_key, "alert fired");
                    summary.fired += 1;
                }
                Ok(DeliveryOutcome::Suppressed) => {
                    debug!(rule = %rule.id, key = %notification.dedupe_key, "alert suppressed");
                    summary.suppressed += 1;
                }
                Err(err) => {
                    warn!(rule = %rule.id, error = %err, "alert delivery failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            %month,
            rules = rules.len(),
            fired = summary.fired,
            failed = summary.failed,
            "alert run finished"
        );
        Ok(summary)
    }
}
