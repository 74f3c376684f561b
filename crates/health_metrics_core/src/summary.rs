use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::metric::MetricKind;
use crate::utils::round1;
use crate::window::SeriesEntry;

/// Headline numbers for one metric over one window. All zero for an empty
/// series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryStats {
    pub current: f64,
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
    /// Last minus first; zero unless there are at least two points.
    pub change: f64,
}

/// Summarize a chronologically ascending series. Every output is rounded to
/// one decimal place.
pub fn summarize(series: &[f64]) -> SummaryStats {
    let (Some(&first), Some(&last)) = (series.first(), series.last()) else {
        return SummaryStats::default();
    };
    let lowest = series.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = series.iter().sum::<f64>() / series.len() as f64;
    let change = if series.len() > 1 { last - first } else { 0.0 };

    SummaryStats {
        current: round1(last),
        lowest: round1(lowest),
        highest: round1(highest),
        average: round1(average),
        change: round1(change),
    }
}

/// [`summarize`] over the values of `kind` in a daily or bucketed series.
pub fn summarize_metric<T: SeriesEntry>(series: &[T], kind: MetricKind) -> SummaryStats {
    summarize(&crate::daily::metric_values(series, kind))
}
