//! Once-per-day nutrition achievement tracking.
//!
//! Each (user, date) moves from [`AchievementState::NoEntry`] to
//! [`AchievementState::Recorded`] at most once. The stored entry is a snapshot
//! taken the first time a complete recomputation arrives; later recomputations
//! for the same date leave it alone even if the totals have changed since.
//!
//! Within one tracker the read-then-append is serialised per (user, date), so
//! concurrent recomputations cannot both observe `NoEntry`. Separate tracker
//! instances over the same store do not coordinate.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_NOTIFICATION_BODY, DEFAULT_NOTIFICATION_TITLE};
use crate::nutrition::{DEFAULT_TARGET_CALORIES, MacroActuals, NutritionTarget};
use crate::{KeyValueStore, MetricsError, NotificationDispatcher, observability, store};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricSnapshot {
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
    pub consumed_calories: f64,
    pub burned_calories: f64,
    pub net_calories: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AchievementHistoryEntry {
    pub date: NaiveDate,
    pub completed: bool,
    pub metrics: MetricSnapshot,
    pub target: NutritionTarget,
    /// Calorie goal actually applied (the user's, or the default).
    pub target_calories: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AchievementState {
    NoEntry,
    Recorded { completed: bool },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AchievementOutcome {
    pub completed: bool,
    /// True only for the call that wrote the day's entry.
    pub is_new_entry: bool,
}

/// Every macro with a target must be met, and net calories must reach the
/// calorie goal. Macros without a target are ignored.
pub fn is_complete(
    actuals: &MacroActuals,
    net_calories: f64,
    target: &NutritionTarget,
    target_calories: f64,
) -> bool {
    let meets = |actual: f64, goal: Option<f64>| goal.is_none_or(|g| actual >= g);
    meets(actuals.carbs, target.carbs)
        && meets(actuals.protein, target.protein)
        && meets(actuals.fats, target.fats)
        && net_calories >= target_calories
}

type DayKey = (String, NaiveDate);

pub struct AchievementTracker {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    default_target_calories: f64,
    notification_title: String,
    notification_body: String,
    in_flight: Mutex<HashMap<DayKey, Arc<Mutex<()>>>>,
}

impl AchievementTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            notifier,
            default_target_calories: DEFAULT_TARGET_CALORIES,
            notification_title: DEFAULT_NOTIFICATION_TITLE.into(),
            notification_body: DEFAULT_NOTIFICATION_BODY.into(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        config: &Config,
    ) -> Self {
        Self::new(store, notifier)
            .with_default_target_calories(config.default_target_calories)
            .with_notification(&config.notification_title, &config.notification_body)
    }

    #[must_use]
    pub fn with_default_target_calories(mut self, calories: f64) -> Self {
        self.default_target_calories = calories;
        self
    }

    #[must_use]
    pub fn with_notification(mut self, title: &str, body: &str) -> Self {
        self.notification_title = title.to_string();
        self.notification_body = body.to_string();
        self
    }

    /// Current state for the day. An unreadable store reads as `NoEntry`.
    pub async fn state(&self, user_id: &str, date: NaiveDate) -> AchievementState {
        match store::find_history_entry(self.store.as_ref(), user_id, date).await {
            Ok(Some(entry)) => AchievementState::Recorded {
                completed: entry.completed,
            },
            Ok(None) => AchievementState::NoEntry,
            Err(e) => {
                self.persistence_failed(user_id, date, &e);
                AchievementState::NoEntry
            }
        }
    }

    /// Decide and record the day's outcome.
    ///
    /// Without a target nothing is recorded. When the day is already recorded
    /// the stored result is returned untouched. When persistence fails the
    /// computed result is returned but nothing is written and no notification
    /// fires.
    pub async fn record_achievement(
        &self,
        user_id: &str,
        date: NaiveDate,
        actuals: MacroActuals,
        consumed_calories: f64,
        burned_calories: f64,
        target: Option<&NutritionTarget>,
    ) -> AchievementOutcome {
        let Some(target) = target else {
            debug!(user_id, %date, error = %MetricsError::MissingTarget, "skipping achievement");
            return AchievementOutcome::default();
        };

        let net_calories = consumed_calories - burned_calories;
        let target_calories = target.calories_or(self.default_target_calories);
        let completed = is_complete(&actuals, net_calories, target, target_calories);
        let entry = AchievementHistoryEntry {
            date,
            completed,
            metrics: MetricSnapshot {
                carbs: actuals.carbs,
                protein: actuals.protein,
                fats: actuals.fats,
                consumed_calories,
                burned_calories,
                net_calories,
            },
            target: target.clone(),
            target_calories,
        };

        let key: DayKey = (user_id.to_string(), date);
        let day_lock = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key.clone()).or_default().clone()
        };
        let outcome = {
            let _guard = day_lock.lock().await;
            self.record_locked(user_id, entry).await
        };
        {
            let mut in_flight = self.in_flight.lock().await;
            // One reference in the map, one here: nobody else is waiting.
            if Arc::strong_count(&day_lock) <= 2 {
                in_flight.remove(&key);
            }
        }
        outcome
    }

    async fn record_locked(
        &self,
        user_id: &str,
        entry: AchievementHistoryEntry,
    ) -> AchievementOutcome {
        let date = entry.date;
        let completed = entry.completed;
        let degraded = AchievementOutcome {
            completed,
            is_new_entry: false,
        };

        match store::find_history_entry(self.store.as_ref(), user_id, date).await {
            Ok(Some(existing)) => {
                debug!(user_id, %date, "achievement already recorded");
                return AchievementOutcome {
                    completed: existing.completed,
                    is_new_entry: false,
                };
            }
            Ok(None) => {}
            Err(e) => {
                self.persistence_failed(user_id, date, &e);
                return degraded;
            }
        }

        if let Err(e) = store::append_history(self.store.as_ref(), user_id, entry).await {
            self.persistence_failed(user_id, date, &e);
            return degraded;
        }
        metrics::counter!(
            observability::ACHIEVEMENTS_RECORDED,
            "completed" => completed.to_string()
        )
        .increment(1);
        info!(user_id, %date, completed, "recorded daily achievement");

        if completed {
            match self
                .notifier
                .schedule(&self.notification_title, &self.notification_body)
                .await
            {
                Ok(()) => {
                    metrics::counter!(observability::NOTIFICATIONS_SCHEDULED).increment(1);
                }
                Err(e) => warn!(user_id, %date, error = %e, "achievement notification not scheduled"),
            }
        }

        AchievementOutcome {
            completed,
            is_new_entry: true,
        }
    }

    fn persistence_failed(&self, user_id: &str, date: NaiveDate, error: &MetricsError) {
        metrics::counter!(observability::PERSISTENCE_FAILURES).increment(1);
        warn!(user_id, %date, error = %error, "achievement history unavailable");
    }
}
