//! Calendar-day reduction: exactly one value per (local date, metric kind).

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::metric::{MetricKind, MetricRecord, Reduction};
use crate::utils::{date_key, round1};
use crate::window::SeriesEntry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub values: BTreeMap<MetricKind, f64>,
}

impl DailyAggregate {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, kind: MetricKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    /// Stable YYYY-MM-DD key usable for sorting in either direction.
    pub fn date_key(&self) -> String {
        date_key(self.date)
    }
}

impl SeriesEntry for DailyAggregate {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self, kind: MetricKind) -> Option<f64> {
        DailyAggregate::value(self, kind)
    }
}

/// Reduces records to one value per day, with "today" fixed by an explicit
/// reference instant rather than the wall clock.
#[derive(Clone, Debug)]
pub struct DailyReducer {
    reference: DateTime<FixedOffset>,
    live_overrides: BTreeMap<MetricKind, f64>,
}

impl DailyReducer {
    pub fn new(reference: DateTime<FixedOffset>) -> Self {
        Self {
            reference,
            live_overrides: BTreeMap::new(),
        }
    }

    /// Use `value` as today's aggregate for `kind` regardless of what the
    /// persisted log says (e.g. a live step counter). Past days are untouched.
    #[must_use]
    pub fn with_live_override(mut self, kind: MetricKind, value: f64) -> Self {
        self.live_overrides.insert(kind, value);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.reference.date_naive()
    }

    /// Daily series for one kind, ascending by date. Records are grouped by
    /// their calendar date in the reference instant's offset, whatever offset
    /// they were stamped with.
    pub fn reduce(&self, records: &[MetricRecord], kind: MetricKind) -> Vec<DailyAggregate> {
        let offset = self.reference.offset();
        let mut by_day: BTreeMap<NaiveDate, Vec<&MetricRecord>> = BTreeMap::new();
        for rec in records.iter().filter(|r| r.kind == kind) {
            by_day.entry(rec.date_in(offset)).or_default().push(rec);
        }

        let today = self.today();
        let mut out: Vec<DailyAggregate> = by_day
            .into_iter()
            .map(|(date, group)| {
                let mut agg = DailyAggregate::new(date);
                agg.values
                    .insert(kind, reduce_group(&group, kind, date == today));
                agg
            })
            .collect();

        if let Some(&live) = self.live_overrides.get(&kind) {
            match out.iter_mut().find(|a| a.date == today) {
                Some(agg) => {
                    agg.values.insert(kind, live);
                }
                None => {
                    let mut agg = DailyAggregate::new(today);
                    agg.values.insert(kind, live);
                    out.push(agg);
                    out.sort_by_key(|a| a.date);
                }
            }
        }
        out
    }

    /// Reduce every kind present (plus any live overrides) and merge them into
    /// one aggregate per date, ascending.
    pub fn reduce_all(&self, records: &[MetricRecord]) -> Vec<DailyAggregate> {
        let mut merged: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();
        for kind in MetricKind::ALL {
            let present =
                self.live_overrides.contains_key(&kind) || records.iter().any(|r| r.kind == kind);
            if !present {
                continue;
            }
            for agg in self.reduce(records, kind) {
                merged
                    .entry(agg.date)
                    .or_insert_with(|| DailyAggregate::new(agg.date))
                    .values
                    .extend(agg.values);
            }
        }
        merged.into_values().collect()
    }
}

fn reduce_group(group: &[&MetricRecord], kind: MetricKind, is_today: bool) -> f64 {
    match kind.reduction() {
        Reduction::Cumulative => group.iter().map(|r| r.value).sum(),
        // `max_by_key` keeps the last of equal maxima, so a tie goes to the
        // later-inserted record.
        Reduction::PointInTime if is_today => group
            .iter()
            .max_by_key(|r| r.timestamp)
            .map(|r| r.value)
            .unwrap_or(0.0),
        Reduction::PointInTime => {
            let sum: f64 = group.iter().map(|r| r.value).sum();
            round1(sum / group.len() as f64)
        }
    }
}

/// Daily series for `kind` relative to `reference`; see [`DailyReducer`].
pub fn aggregate_daily(
    records: &[MetricRecord],
    kind: MetricKind,
    reference: DateTime<FixedOffset>,
) -> Vec<DailyAggregate> {
    DailyReducer::new(reference).reduce(records, kind)
}

/// Re-sort for history lists (newest first).
pub fn newest_first(mut series: Vec<DailyAggregate>) -> Vec<DailyAggregate> {
    series.sort_by(|a, b| b.date.cmp(&a.date));
    series
}

/// Values of `kind` in series order, skipping entries that lack it.
pub fn metric_values<T: SeriesEntry>(series: &[T], kind: MetricKind) -> Vec<f64> {
    series.iter().filter_map(|e| e.value(kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn rec(s: &str, kind: MetricKind, value: f64) -> MetricRecord {
        MetricRecord::new(at(s), kind, value)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cumulative_sums_every_day_including_today() {
        let records = vec![
            rec("2025-01-09T08:00:00+00:00", MetricKind::Calories, 400.0),
            rec("2025-01-09T19:00:00+00:00", MetricKind::Calories, 700.0),
            rec("2025-01-10T07:00:00+00:00", MetricKind::Calories, 300.0),
            rec("2025-01-10T12:00:00+00:00", MetricKind::Calories, 550.0),
        ];
        let out = aggregate_daily(&records, MetricKind::Calories, at("2025-01-10T20:00:00+00:00"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value(MetricKind::Calories), Some(1100.0));
        assert_eq!(out[1].value(MetricKind::Calories), Some(850.0));
    }

    #[test]
    fn point_in_time_past_day_is_rounded_mean() {
        let records = vec![
            rec("2025-01-08T07:00:00+00:00", MetricKind::Weight, 80.0),
            rec("2025-01-08T21:00:00+00:00", MetricKind::Weight, 80.25),
            rec("2025-01-08T22:00:00+00:00", MetricKind::Weight, 80.3),
        ];
        let out = aggregate_daily(&records, MetricKind::Weight, at("2025-01-10T12:00:00+00:00"));
        assert_eq!(out[0].value(MetricKind::Weight), Some(80.2));
    }

    #[test]
    fn point_in_time_today_is_latest_wins() {
        let records = vec![
            rec("2025-01-10T07:00:00+00:00", MetricKind::Weight, 81.0),
            rec("2025-01-10T18:00:00+00:00", MetricKind::Weight, 80.4),
            rec("2025-01-10T09:00:00+00:00", MetricKind::Weight, 79.0),
        ];
        let out = aggregate_daily(&records, MetricKind::Weight, at("2025-01-10T20:00:00+00:00"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value(MetricKind::Weight), Some(80.4));
    }

    #[test]
    fn today_tie_goes_to_later_insertion() {
        let records = vec![
            rec("2025-01-10T07:00:00+00:00", MetricKind::Weight, 81.0),
            rec("2025-01-10T07:00:00+00:00", MetricKind::Weight, 82.0),
        ];
        let out = aggregate_daily(&records, MetricKind::Weight, at("2025-01-10T20:00:00+00:00"));
        assert_eq!(out[0].value(MetricKind::Weight), Some(82.0));
    }

    #[test]
    fn grouping_uses_local_date_not_utc() {
        // 23:30 local on the 9th is already the 10th in UTC.
        let records = vec![rec("2025-01-09T23:30:00-05:00", MetricKind::Steps, 1200.0)];
        let out = aggregate_daily(&records, MetricKind::Steps, at("2025-01-10T12:00:00-05:00"));
        assert_eq!(out[0].date, day(2025, 1, 9));
    }

    #[test]
    fn utc_stamped_record_lands_on_the_reference_local_day() {
        // 02:00Z on the 10th is 21:00 on the 9th at -05:00.
        let records = vec![
            rec("2025-01-10T02:00:00+00:00", MetricKind::Weight, 80.0),
            rec("2025-01-10T09:00:00-05:00", MetricKind::Weight, 82.0),
        ];
        let out = aggregate_daily(&records, MetricKind::Weight, at("2025-01-10T12:00:00-05:00"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, day(2025, 1, 9));
        assert_eq!(out[0].value(MetricKind::Weight), Some(80.0));
        assert_eq!(out[1].date, day(2025, 1, 10));
        assert_eq!(out[1].value(MetricKind::Weight), Some(82.0));
    }

    #[test]
    fn live_override_replaces_only_today() {
        let records = vec![
            rec("2025-01-09T08:00:00+00:00", MetricKind::Steps, 5000.0),
            rec("2025-01-10T08:00:00+00:00", MetricKind::Steps, 1000.0),
        ];
        let reducer =
            DailyReducer::new(at("2025-01-10T20:00:00+00:00")).with_live_override(MetricKind::Steps, 6400.0);
        let out = reducer.reduce(&records, MetricKind::Steps);
        assert_eq!(out[0].value(MetricKind::Steps), Some(5000.0));
        assert_eq!(out[1].value(MetricKind::Steps), Some(6400.0));
    }

    #[test]
    fn live_override_creates_today_when_missing() {
        let records = vec![rec("2025-01-08T08:00:00+00:00", MetricKind::Steps, 5000.0)];
        let reducer =
            DailyReducer::new(at("2025-01-10T20:00:00+00:00")).with_live_override(MetricKind::Steps, 10.0);
        let out = reducer.reduce(&records, MetricKind::Steps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].date, day(2025, 1, 10));
    }

    #[test]
    fn reduce_all_merges_kinds_per_date() {
        let records = vec![
            rec("2025-01-09T08:00:00+00:00", MetricKind::Weight, 80.0),
            rec("2025-01-09T09:00:00+00:00", MetricKind::WaterMl, 250.0),
            rec("2025-01-09T10:00:00+00:00", MetricKind::WaterMl, 500.0),
            rec("2025-01-10T09:00:00+00:00", MetricKind::WaterMl, 300.0),
        ];
        let out = DailyReducer::new(at("2025-01-10T20:00:00+00:00")).reduce_all(&records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value(MetricKind::Weight), Some(80.0));
        assert_eq!(out[0].value(MetricKind::WaterMl), Some(750.0));
        assert_eq!(out[1].value(MetricKind::Weight), None);
    }

    #[test]
    fn newest_first_reverses_canonical_order() {
        let records = vec![
            rec("2025-01-08T08:00:00+00:00", MetricKind::Steps, 1.0),
            rec("2025-01-09T08:00:00+00:00", MetricKind::Steps, 2.0),
        ];
        let out = newest_first(aggregate_daily(
            &records,
            MetricKind::Steps,
            at("2025-01-10T08:00:00+00:00"),
        ));
        assert_eq!(out[0].date_key(), "2025-01-09");
        assert_eq!(metric_values(&out, MetricKind::Steps), vec![2.0, 1.0]);
    }

    #[test]
    fn empty_input_yields_empty_series() {
        assert!(aggregate_daily(&[], MetricKind::Weight, at("2025-01-10T08:00:00+00:00")).is_empty());
    }
}
