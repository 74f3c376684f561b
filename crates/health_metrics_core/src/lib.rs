//! Time-bucketed health metrics aggregation and the daily achievement tracker.
//!
//! Everything except [`achievement`] and [`store`] is pure and synchronous:
//! callers hand in already-fetched records plus an explicit reference instant
//! and get derived values back. The persistence and notification collaborators
//! are reached only through the [`KeyValueStore`] and [`NotificationDispatcher`]
//! traits.

use async_trait::async_trait;
use thiserror::Error;

pub mod achievement;
pub mod config;
pub mod daily;
pub mod metric;
pub mod normalize;
pub mod nutrition;
pub mod observability;
pub mod period;
pub mod store;
pub mod summary;
pub mod utils;
pub mod window;

pub use achievement::{
    AchievementHistoryEntry, AchievementOutcome, AchievementState, AchievementTracker,
    MetricSnapshot, is_complete,
};
pub use config::Config;
pub use daily::{DailyAggregate, DailyReducer, aggregate_daily, metric_values, newest_first};
pub use metric::{MetricKind, MetricRecord, Reduction};
pub use normalize::{NormalizeReport, RawRecord, normalize, normalize_json};
pub use nutrition::{
    CalorieSummary, DEFAULT_TARGET_CALORIES, DailyTotals, MacroActuals, MacroProgress,
    NutritionSummary, NutritionTarget, derive_full_summary, derive_nutrition_summary,
    macro_progress,
};
pub use period::{Granularity, PeriodBucket, PeriodKey, bucket_period};
pub use store::InMemoryStore;
pub use summary::{SummaryStats, summarize, summarize_metric};
pub use window::{SeriesEntry, WindowToken, dashboard_series, select_window};

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("no nutrition target set")]
    MissingTarget,
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error("notification dispatch failed: {0}")]
    Notification(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// String key-value persistence owned by the host application.
///
/// Keys are namespaced by user id (and calendar date where daily), see
/// [`store::keys`]. Values are JSON documents.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, MetricsError>;
    async fn set(&self, key: &str, value: String) -> Result<(), MetricsError>;
}

/// Schedules a single local notification. Fire-and-forget: an `Ok` only means
/// the request was handed off, not that anything was delivered.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    async fn schedule(&self, title: &str, body: &str) -> Result<(), MetricsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_readable() {
        let e = MetricsError::PersistenceUnavailable("disk gone".into());
        assert_eq!(e.to_string(), "persistence unavailable: disk gone");
        assert_eq!(
            MetricsError::MissingTarget.to_string(),
            "no nutrition target set"
        );
    }

    #[test]
    fn serde_errors_convert() {
        let res: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: MetricsError = res.unwrap_err().into();
        assert!(matches!(err, MetricsError::Serialization(_)));
    }
}
