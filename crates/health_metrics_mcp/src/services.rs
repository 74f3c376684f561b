use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::{debug, warn};

use health_metrics_core::store;
use health_metrics_core::utils::{parse_date_key, parse_local_timestamp};
use health_metrics_core::{
    AchievementTracker, CalorieSummary, Config, DailyAggregate, DailyReducer, DailyTotals,
    KeyValueStore, MacroActuals, MetricKind, NotificationDispatcher, NutritionTarget,
    derive_full_summary, derive_nutrition_summary, normalize_json,
};

use crate::error::{McpError, McpResult};
use crate::types::{
    DashboardParams, DashboardResult, HistoryResult, RecordAchievementParams,
    RecordAchievementResult,
};

/// Stateful operations shared by the MCP tools and the HTTP routes. All of
/// them act on the configured user.
#[derive(Clone)]
pub struct NutritionService {
    config: Arc<Config>,
    store: Arc<dyn KeyValueStore>,
    tracker: Arc<AchievementTracker>,
}

impl NutritionService {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let tracker = AchievementTracker::from_config(store.clone(), notifier, &config);
        Self {
            config: Arc::new(config),
            store,
            tracker: Arc::new(tracker),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Explicit offset, or the configured one.
    pub fn offset(&self, raw: Option<&str>) -> McpResult<FixedOffset> {
        match raw {
            Some(s) => s
                .trim()
                .parse::<FixedOffset>()
                .map_err(|_| McpError::Validation(format!("invalid utc_offset: {s}"))),
            None => Ok(self.config.utc_offset),
        }
    }

    /// Explicit reference instant, or the current time in `offset`.
    pub fn reference_instant(
        &self,
        raw: Option<&str>,
        offset: FixedOffset,
    ) -> McpResult<DateTime<FixedOffset>> {
        match raw {
            Some(s) => parse_local_timestamp(s, offset)
                .ok_or_else(|| McpError::Validation(format!("invalid timestamp: {s}"))),
            None => Ok(Utc::now().with_timezone(&offset)),
        }
    }

    pub fn parse_date(raw: &str) -> McpResult<NaiveDate> {
        parse_date_key(raw).ok_or_else(|| McpError::Validation(format!("invalid date: {raw}")))
    }

    pub async fn target(&self) -> McpResult<Option<NutritionTarget>> {
        Ok(store::load_target(self.store.as_ref(), &self.config.user_id).await?)
    }

    pub async fn set_target(&self, target: NutritionTarget) -> McpResult<NutritionTarget> {
        for (name, value) in [
            ("calories", target.calories),
            ("carbs", target.carbs),
            ("protein", target.protein),
            ("fats", target.fats),
        ] {
            if value.is_some_and(|v| !(v.is_finite() && v >= 0.0)) {
                return Err(McpError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        store::save_target(self.store.as_ref(), &self.config.user_id, &target).await?;
        debug!(user_id = %self.config.user_id, "nutrition target updated");
        Ok(target)
    }

    /// Calorie progress. Without an explicit goal the stored target applies,
    /// falling back to the configured default when it is unset or unreadable.
    pub async fn calorie_summary(
        &self,
        consumed: f64,
        burned: f64,
        target_calories: Option<f64>,
    ) -> CalorieSummary {
        let target = match target_calories {
            Some(t) => t,
            None => self
                .target_or_none()
                .await
                .map(|t| t.calories_or(self.config.default_target_calories))
                .unwrap_or(self.config.default_target_calories),
        };
        derive_nutrition_summary(consumed, burned, target)
    }

    pub async fn record(&self, params: RecordAchievementParams) -> McpResult<RecordAchievementResult> {
        let date = Self::parse_date(&params.date)?;
        let target = self.target_or_none().await;
        let outcome = self
            .tracker
            .record_achievement(
                &self.config.user_id,
                date,
                MacroActuals {
                    carbs: params.carbs,
                    protein: params.protein,
                    fats: params.fats,
                },
                params.consumed_calories,
                params.burned_calories,
                target.as_ref(),
            )
            .await;
        let state = self.tracker.state(&self.config.user_id, date).await;
        Ok(RecordAchievementResult { outcome, state })
    }

    /// Newest first.
    pub async fn history(&self, limit: Option<usize>) -> McpResult<HistoryResult> {
        let mut entries = store::load_history(self.store.as_ref(), &self.config.user_id).await?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(HistoryResult { entries })
    }

    /// Today's dashboard: reduce the raw logs, derive the nutrition summary,
    /// cache it as the day's snapshot and settle the day's achievement.
    pub async fn dashboard(&self, params: DashboardParams) -> McpResult<DashboardResult> {
        let offset = self.offset(params.utc_offset.as_deref())?;
        let now = self.reference_instant(params.now.as_deref(), offset)?;
        let report = normalize_json(&params.records, offset);

        let mut reducer = DailyReducer::new(now);
        if let Some(steps) = params.live_steps {
            reducer = reducer.with_live_override(MetricKind::Steps, steps);
        }
        let today = reducer.today();
        let day = reducer
            .reduce_all(&report.records)
            .into_iter()
            .find(|a| a.date == today)
            .unwrap_or_else(|| DailyAggregate::new(today));
        let totals = DailyTotals::from_aggregate(&day);

        let target = self.target_or_none().await;
        let summary =
            derive_full_summary(&totals, target.as_ref(), self.config.default_target_calories);
        if let Err(e) =
            store::save_snapshot(self.store.as_ref(), &self.config.user_id, today, &summary).await
        {
            warn!(date = %today, error = %e, "daily snapshot not cached");
        }

        let achievement = self
            .tracker
            .record_achievement(
                &self.config.user_id,
                today,
                totals.macros,
                totals.consumed_calories,
                totals.burned_calories,
                target.as_ref(),
            )
            .await;

        Ok(DashboardResult {
            date: today,
            summary,
            target,
            achievement,
            steps: day.value(MetricKind::Steps).unwrap_or(0.0),
            water_ml: day.value(MetricKind::WaterMl).unwrap_or(0.0),
            dropped: report.dropped,
        })
    }

    async fn target_or_none(&self) -> Option<NutritionTarget> {
        match self.target().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "nutrition target unavailable");
                None
            }
        }
    }
}
