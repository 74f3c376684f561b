//! ISO-week and calendar-month rollups of daily aggregates.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::MetricsError;
use crate::daily::DailyAggregate;
use crate::metric::MetricKind;
use crate::utils::round1;
use crate::window::SeriesEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl std::str::FromStr for Granularity {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Granularity::Daily),
            "weekly" | "week" => Ok(Granularity::Weekly),
            "monthly" | "month" => Ok(Granularity::Monthly),
            other => Err(MetricsError::InvalidArgument(format!(
                "unknown granularity: {other}"
            ))),
        }
    }
}

/// Field order matters: derived `Ord` compares the year before the week or
/// month, which keeps buckets chronological across year boundaries.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodKey {
    Day { date: NaiveDate },
    Week { iso_year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

impl PeriodKey {
    pub fn for_date(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Daily => PeriodKey::Day { date },
            Granularity::Weekly => {
                let iso = date.iso_week();
                PeriodKey::Week {
                    iso_year: iso.year(),
                    week: iso.week(),
                }
            }
            Granularity::Monthly => PeriodKey::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }

    /// First calendar day of the period (Monday for ISO weeks).
    pub fn start_date(&self) -> Option<NaiveDate> {
        match *self {
            PeriodKey::Day { date } => Some(date),
            PeriodKey::Week { iso_year, week } => {
                NaiveDate::from_isoywd_opt(iso_year, week, Weekday::Mon)
            }
            PeriodKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodKey::Day { date } => write!(f, "{}", date.format("%Y-%m-%d")),
            PeriodKey::Week { iso_year, week } => write!(f, "{iso_year}-W{week:02}"),
            PeriodKey::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodBucket {
    pub key: PeriodKey,
    /// Display label, e.g. `2025-W01` or `2025-01`.
    pub label: String,
    /// Representative date used for window filtering.
    pub start: NaiveDate,
    /// Number of daily aggregates that contributed.
    pub days: usize,
    pub values: BTreeMap<MetricKind, f64>,
}

impl SeriesEntry for PeriodBucket {
    fn date(&self) -> NaiveDate {
        self.start
    }

    fn value(&self, kind: MetricKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }
}

#[derive(Default)]
struct BucketAcc {
    days: usize,
    sums: BTreeMap<MetricKind, (f64, usize)>,
}

/// Group daily aggregates into periods. Each value is the mean of the
/// contributing daily values, rounded to one decimal; periods with no data are
/// not emitted.
pub fn bucket_period(daily: &[DailyAggregate], granularity: Granularity) -> Vec<PeriodBucket> {
    let mut acc: BTreeMap<PeriodKey, BucketAcc> = BTreeMap::new();
    for agg in daily {
        let bucket = acc
            .entry(PeriodKey::for_date(agg.date, granularity))
            .or_default();
        bucket.days += 1;
        for (&kind, &value) in &agg.values {
            let slot = bucket.sums.entry(kind).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }
    }

    acc.into_iter()
        .filter_map(|(key, b)| {
            let start = key.start_date()?;
            let values = b
                .sums
                .into_iter()
                .map(|(kind, (sum, n))| (kind, round1(sum / n as f64)))
                .collect();
            Some(PeriodBucket {
                key,
                label: key.to_string(),
                start,
                days: b.days,
                values,
            })
        })
        .collect()
}
