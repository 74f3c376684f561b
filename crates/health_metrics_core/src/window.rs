//! Relative time-window selection over dated series.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::MetricsError;
use crate::daily::DailyAggregate;
use crate::metric::MetricKind;
use crate::period::{Granularity, PeriodBucket, bucket_period};

/// Anything plotted on a time axis: a day or a period bucket.
pub trait SeriesEntry {
    fn date(&self) -> NaiveDate;
    fn value(&self, kind: MetricKind) -> Option<f64>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum WindowToken {
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "30d")]
    Days30,
    #[serde(rename = "3m")]
    Months3,
    #[serde(rename = "6m")]
    Months6,
    #[serde(rename = "12m")]
    Months12,
}

impl WindowToken {
    /// Fixed elapsed length; months are not calendar-relative.
    pub fn days(self) -> i64 {
        match self {
            WindowToken::Days7 => 7,
            WindowToken::Days30 => 30,
            WindowToken::Months3 => 90,
            WindowToken::Months6 => 180,
            WindowToken::Months12 => 365,
        }
    }

    pub fn length(self) -> Duration {
        Duration::days(self.days())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WindowToken::Days7 => "7d",
            WindowToken::Days30 => "30d",
            WindowToken::Months3 => "3m",
            WindowToken::Months6 => "6m",
            WindowToken::Months12 => "12m",
        }
    }
}

impl std::fmt::Display for WindowToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WindowToken {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(WindowToken::Days7),
            "30d" => Ok(WindowToken::Days30),
            "3m" => Ok(WindowToken::Months3),
            "6m" => Ok(WindowToken::Months6),
            "12m" | "1y" => Ok(WindowToken::Months12),
            other => Err(MetricsError::InvalidArgument(format!(
                "unknown window: {other}"
            ))),
        }
    }
}

/// Keep entries dated within `[now - window, now]`, both ends inclusive at day
/// resolution. Input order is preserved.
///
/// Granularity is fixed by the series passed in: for weekly or monthly charts
/// use [`dashboard_series`], which buckets first and then calls this.
pub fn select_window<T: SeriesEntry + Clone>(
    series: &[T],
    window: WindowToken,
    now: DateTime<FixedOffset>,
) -> Vec<T> {
    let upper = now.date_naive();
    let lower = (now - window.length()).date_naive();
    series
        .iter()
        .filter(|e| {
            let d = e.date();
            d >= lower && d <= upper
        })
        .cloned()
        .collect()
}

/// Chart series for one screen: bucket the daily aggregates at `granularity`,
/// then window the buckets by their start date.
pub fn dashboard_series(
    daily: &[DailyAggregate],
    granularity: Granularity,
    window: WindowToken,
    now: DateTime<FixedOffset>,
) -> Vec<PeriodBucket> {
    let buckets = bucket_period(daily, granularity);
    let selected = select_window(&buckets, window, now);
    debug!(
        granularity = ?granularity,
        window = %window,
        buckets = buckets.len(),
        kept = selected.len(),
        "selected dashboard window"
    );
    selected
}
