use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use health_metrics_core::{
    AchievementHistoryEntry, AchievementOutcome, AchievementState, DailyAggregate, Granularity,
    MetricKind, MetricRecord, NutritionSummary, NutritionTarget, PeriodBucket, WindowToken,
};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct NormalizeParams {
    /// Raw log entries, each tagged with `source`
    /// (body_measurement, nutrition, hydration, activity, steps, generic).
    pub records: Vec<serde_json::Value>,
    /// Offset for timestamps without a zone, e.g. "+02:00". Defaults to the
    /// server's configured offset.
    pub utc_offset: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct NormalizeResult {
    pub records: Vec<MetricRecord>,
    pub dropped: usize,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct AggregateParams {
    pub records: Vec<serde_json::Value>,
    /// Single metric to reduce; every metric present when omitted.
    pub kind: Option<MetricKind>,
    /// Reference instant (RFC 3339 or local "YYYY-MM-DD HH:MM:SS"); defaults to now.
    pub now: Option<String>,
    /// Values that replace today's aggregate, e.g. a live step count.
    pub live_overrides: Option<BTreeMap<MetricKind, f64>>,
    /// Return newest day first (default: ascending).
    pub newest_first: Option<bool>,
    pub utc_offset: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AggregateResult {
    pub days: Vec<DailyAggregate>,
    pub dropped: usize,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct BucketParams {
    /// Daily aggregates, ascending.
    pub days: Vec<DailyAggregate>,
    pub granularity: Granularity,
    /// When set, only buckets starting inside this window are returned.
    pub window: Option<WindowToken>,
    pub now: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BucketResult {
    pub buckets: Vec<PeriodBucket>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SelectWindowParams {
    pub days: Vec<DailyAggregate>,
    pub window: WindowToken,
    pub now: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SelectWindowResult {
    pub days: Vec<DailyAggregate>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SummarizeParams {
    /// Chronologically ascending values.
    pub values: Option<Vec<f64>>,
    /// Alternatively, daily aggregates plus the metric to read from them.
    pub days: Option<Vec<DailyAggregate>>,
    pub kind: Option<MetricKind>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CalorieParams {
    pub consumed_calories: f64,
    pub burned_calories: f64,
    /// Calorie goal; the stored target (or the default) when omitted.
    pub target_calories: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DashboardParams {
    /// Raw log entries covering at least today.
    pub records: Vec<serde_json::Value>,
    pub now: Option<String>,
    /// Live step count for today, if the device reports one.
    pub live_steps: Option<f64>,
    pub utc_offset: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DashboardResult {
    pub date: NaiveDate,
    pub summary: NutritionSummary,
    pub target: Option<NutritionTarget>,
    pub achievement: AchievementOutcome,
    pub steps: f64,
    pub water_ml: f64,
    pub dropped: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TargetResult {
    pub target: Option<NutritionTarget>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RecordAchievementParams {
    /// Calendar date, YYYY-MM-DD.
    pub date: String,
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
    pub consumed_calories: f64,
    pub burned_calories: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RecordAchievementResult {
    #[serde(flatten)]
    pub outcome: AchievementOutcome,
    pub state: AchievementState,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct HistoryParams {
    /// Newest entries first; all entries when omitted.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct HistoryResult {
    pub entries: Vec<AchievementHistoryEntry>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ProgressReviewParams {
    /// 7d, 30d, 3m, 6m or 12m
    pub window: Option<String>,
    /// Metric name, e.g. weight or steps
    pub metric: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct NutritionCheckParams {
    /// YYYY-MM-DD; today when omitted
    pub date: Option<String>,
}
