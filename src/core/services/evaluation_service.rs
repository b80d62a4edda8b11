use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use timeledger_config::EngineSettings;
use timeledger_domain::{MonthKey, RowSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::MonthGrid;
use crate::core::context::EngineContext;
use crate::core::engine::TimeValueEngine;
use crate::core::prefetch;
use crate::core::result::AggregateResult;
use crate::core::simulation::{Scenario, ScenarioComparison, ScenarioEngine};
use crate::errors::{EngineError, Result};
use crate::provider::DataProvider;

/// Requested months; missing bounds are filled from the default window length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowRequest {
    pub from: Option<MonthKey>,
    pub to: Option<MonthKey>,
}

impl WindowRequest {
    pub fn new(from: Option<MonthKey>, to: Option<MonthKey>) -> Self {
        Self { from, to }
    }
}

/// Loads rows, rates and FX for a user and runs the pipeline over them.
pub struct EvaluationService {
    provider: Arc<dyn DataProvider>,
    settings: EngineSettings,
}

impl EvaluationService {
    pub fn new(provider: Arc<dyn DataProvider>, settings: EngineSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }

    /// Resolves a window. With no bounds the window is the trailing
    /// `default_window_months` ending at the month of `as_of` (today when absent).
    pub fn window(&self, request: WindowRequest, as_of: Option<NaiveDate>) -> Result<MonthGrid> {
        let length = self.settings.default_window_months.max(1);
        match (request.from, request.to) {
            (Some(from), Some(to)) => MonthGrid::new(from, to),
            (Some(from), None) => MonthGrid::new(from, from.add_months(length as i64 - 1)),
            (None, Some(to)) => Ok(MonthGrid::trailing(to, length)),
            (None, None) => {
                let reference = as_of.unwrap_or_else(|| Utc::now().date_naive());
                Ok(MonthGrid::trailing(MonthKey::from_date(reference), length))
            }
        }
    }

    /// Context for one user without FX; callers attach a prefetched table. Open-ended
    /// recurring rows stop at `as_of`, today when absent.
    pub fn context_for(&self, user: Uuid, as_of: Option<NaiveDate>) -> Result<EngineContext> {
        let profile = self.provider.user_profile(user)?;
        let timeline = self.provider.hourly_rate_timeline(user)?;
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let ctx = EngineContext::from_settings(&self.settings, profile.as_ref(), &timeline);
        Ok(ctx.with_as_of(Some(as_of)))
    }

    /// Compares a persisted scenario against the baseline.
    pub fn evaluate(
        &self,
        user: Uuid,
        scenario_id: Uuid,
        window: WindowRequest,
        as_of: Option<NaiveDate>,
    ) -> Result<ScenarioComparison> {
        let scenario = self
            .provider
            .scenario(user, scenario_id)?
            .ok_or(EngineError::UnknownScenario {
                user,
                scenario: scenario_id,
            })?;
        self.preview(user, &scenario, window, as_of)
    }

    /// Compares an ad-hoc scenario against the baseline.
    pub fn preview(
        &self,
        user: Uuid,
        scenario: &Scenario,
        window: WindowRequest,
        as_of: Option<NaiveDate>,
    ) -> Result<ScenarioComparison> {
        let grid = self.window(window, as_of)?;
        let rows = self.provider.rows(user)?;
        let scenario_rows = ScenarioEngine::apply(&rows, scenario);
        let ctx = self.prefetched(user, &[&rows, &scenario_rows], &grid, as_of)?;
        info!(
            %user,
            scenario = %scenario.id,
            from = %grid.first(),
            to = %grid.last(),
            "evaluating scenario"
        );
        Ok(ScenarioEngine::compare(&rows, &ctx, &grid, scenario))
    }

    /// Plain pipeline run for one user over `grid`.
    pub fn run(
        &self,
        user: Uuid,
        grid: &MonthGrid,
        as_of: Option<NaiveDate>,
    ) -> Result<AggregateResult> {
        let rows = self.provider.rows(user)?;
        let ctx = self.prefetched(user, &[&rows], grid, as_of)?;
        Ok(TimeValueEngine::run(&rows, &ctx, grid))
    }

    fn prefetched(
        &self,
        user: Uuid,
        row_sets: &[&RowSet],
        grid: &MonthGrid,
        as_of: Option<NaiveDate>,
    ) -> Result<EngineContext> {
        let ctx = self.context_for(user, as_of)?;
        let keys = prefetch::fx_keys(row_sets.iter().copied(), &ctx, grid);
        if keys.is_empty() {
            return Ok(ctx);
        }
        debug!(%user, keys = keys.len(), "prefetching fx rates");
        let table = self.provider.fx_rates(ctx.anchor_currency(), &keys)?;
        Ok(ctx.with_fx_table(table))
    }
}
