//! Turns source-specific raw entries into canonical [`MetricRecord`]s.
//!
//! One bad entry never aborts the pass: entries with an unparsable timestamp,
//! an unknown metric kind, or a missing point-in-time value are skipped and
//! counted in [`NormalizeReport::dropped`].

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::metric::{MetricKind, MetricRecord};
use crate::observability;
use crate::utils::parse_local_timestamp;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawRecord {
    BodyMeasurement(BodyMeasurementLog),
    Nutrition(NutritionLog),
    Hydration(HydrationLog),
    Activity(ActivityLog),
    Steps(StepLog),
    Generic(GenericMetric),
}

// Documents may carry several spellings at once (`_id` next to `id`), so each
// distinct key gets its own field. Accessors pick the first one present.

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BodyMeasurementLog {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_opt_string")]
    pub doc_id: Option<String>,
    #[serde(default, alias = "measuredAt")]
    pub measured_at: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub weight: Option<f64>,
    #[serde(default, alias = "bodyFat", deserialize_with = "deserialize_opt_number")]
    pub body_fat: Option<f64>,
    #[serde(
        default,
        alias = "bodyFatPercentage",
        alias = "body_fat_percent",
        deserialize_with = "deserialize_opt_number"
    )]
    pub body_fat_percentage: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub waist: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub chest: Option<f64>,
    #[serde(default, alias = "hip", deserialize_with = "deserialize_opt_number")]
    pub hips: Option<f64>,
    #[serde(default, alias = "arms", deserialize_with = "deserialize_opt_number")]
    pub arm: Option<f64>,
    #[serde(default, alias = "thighs", deserialize_with = "deserialize_opt_number")]
    pub thigh: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub neck: Option<f64>,
}

impl BodyMeasurementLog {
    pub fn source_id(&self) -> Option<String> {
        first([&self.doc_id, &self.id])
    }

    pub fn timestamp(&self) -> Option<String> {
        first([&self.measured_at, &self.date, &self.created_at])
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionLog {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_opt_string")]
    pub doc_id: Option<String>,
    #[serde(default, alias = "consumedAt")]
    pub consumed_at: Option<String>,
    #[serde(default, alias = "consumptionDate")]
    pub consumption_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub carbohydrates: Option<f64>,
    #[serde(default, alias = "fat", deserialize_with = "deserialize_opt_number")]
    pub fats: Option<f64>,
    #[serde(default, alias = "mealType")]
    pub meal_type: Option<String>,
}

impl NutritionLog {
    pub fn source_id(&self) -> Option<String> {
        first([&self.doc_id, &self.id])
    }

    pub fn timestamp(&self) -> Option<String> {
        first([&self.consumed_at, &self.consumption_date, &self.date])
    }

    pub fn carbs(&self) -> Option<f64> {
        first([&self.carbs, &self.carbohydrates])
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HydrationLog {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_opt_string")]
    pub doc_id: Option<String>,
    #[serde(default, alias = "consumedAt")]
    pub consumed_at: Option<String>,
    #[serde(default, alias = "consumptionDate")]
    pub consumption_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "amountMl", deserialize_with = "deserialize_opt_number")]
    pub amount_ml: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub amount: Option<f64>,
}

impl HydrationLog {
    pub fn source_id(&self) -> Option<String> {
        first([&self.doc_id, &self.id])
    }

    pub fn timestamp(&self) -> Option<String> {
        first([&self.consumed_at, &self.consumption_date, &self.date])
    }

    pub fn amount_ml(&self) -> Option<f64> {
        first([&self.amount_ml, &self.volume, &self.amount])
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityLog {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_opt_string")]
    pub doc_id: Option<String>,
    #[serde(default, alias = "performedAt")]
    pub performed_at: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(
        default,
        alias = "caloriesBurned",
        deserialize_with = "deserialize_opt_number"
    )]
    pub calories_burned: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub calories: Option<f64>,
    #[serde(
        default,
        alias = "durationMinutes",
        deserialize_with = "deserialize_opt_number"
    )]
    pub duration_minutes: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub duration: Option<f64>,
}

impl ActivityLog {
    pub fn source_id(&self) -> Option<String> {
        first([&self.doc_id, &self.id])
    }

    pub fn timestamp(&self) -> Option<String> {
        first([&self.performed_at, &self.date])
    }

    pub fn calories_burned(&self) -> Option<f64> {
        first([&self.calories_burned, &self.calories])
    }

    pub fn duration_minutes(&self) -> Option<f64> {
        first([&self.duration_minutes, &self.duration])
    }
}

/// Locally cached step/duration/target triple keyed by (user, calendar date).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StepLog {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub steps: Option<f64>,
    #[serde(
        default,
        alias = "durationMinutes",
        deserialize_with = "deserialize_opt_number"
    )]
    pub duration_minutes: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub duration: Option<f64>,
    /// Daily goal; carried through but never turned into a metric.
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub target: Option<f64>,
}

impl StepLog {
    pub fn duration_minutes(&self) -> Option<f64> {
        first([&self.duration_minutes, &self.duration])
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GenericMetric {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_opt_string")]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "recordedAt")]
    pub recorded_at: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, rename = "type")]
    pub kind_type: Option<String>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub value: Option<f64>,
}

impl GenericMetric {
    pub fn source_id(&self) -> Option<String> {
        first([&self.doc_id, &self.id])
    }

    pub fn timestamp(&self) -> Option<String> {
        first([&self.timestamp, &self.recorded_at, &self.date])
    }

    pub fn kind_name(&self) -> Option<String> {
        first([&self.kind, &self.kind_type, &self.metric])
    }
}

fn first<T: Clone, const N: usize>(candidates: [&Option<T>; N]) -> Option<T> {
    candidates.into_iter().find_map(|c| c.clone())
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string().into()),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Numbers sometimes arrive as strings from form-backed sources; anything that
/// does not read as a finite number counts as missing.
fn deserialize_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|v| v.is_finite()))
}

/// Result of one normalization pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    /// Ascending by timestamp; equal timestamps keep input order.
    pub records: Vec<MetricRecord>,
    pub dropped: usize,
}

/// Normalize typed raw entries, interpreting zone-less timestamps in `local`.
pub fn normalize(raw: &[RawRecord], local: FixedOffset) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for entry in raw {
        if !push_entry(entry, local, &mut report.records) {
            report.dropped += 1;
        }
    }
    finish(report)
}

/// Normalize untyped JSON entries. Values that match no known source shape
/// count as dropped.
pub fn normalize_json(values: &[serde_json::Value], local: FixedOffset) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for value in values {
        let accepted = match RawRecord::deserialize(value) {
            Ok(entry) => push_entry(&entry, local, &mut report.records),
            Err(e) => {
                debug!(error = %e, "raw record did not match any source");
                false
            }
        };
        if !accepted {
            report.dropped += 1;
        }
    }
    finish(report)
}

fn finish(mut report: NormalizeReport) -> NormalizeReport {
    report.records.sort_by_key(|r| r.timestamp);
    metrics::counter!(observability::RECORDS_NORMALIZED).increment(report.records.len() as u64);
    metrics::counter!(observability::RECORDS_DROPPED).increment(report.dropped as u64);
    debug!(
        kept = report.records.len(),
        dropped = report.dropped,
        "normalized raw records"
    );
    report
}

/// Appends the records produced by `entry`; returns false when the whole entry
/// is malformed.
fn push_entry(entry: &RawRecord, local: FixedOffset, out: &mut Vec<MetricRecord>) -> bool {
    let ts = |s: Option<String>| -> Option<DateTime<FixedOffset>> {
        s.as_deref().and_then(|s| parse_local_timestamp(s, local))
    };
    let emit = |out: &mut Vec<MetricRecord>,
                at: DateTime<FixedOffset>,
                kind: MetricKind,
                value: f64,
                id: &Option<String>| {
        let mut rec = MetricRecord::new(at, kind, value);
        rec.source_id = id.clone();
        out.push(rec);
    };

    match entry {
        RawRecord::BodyMeasurement(log) => {
            let Some(at) = ts(log.timestamp()) else {
                return false;
            };
            let id = log.source_id();
            let fields = [
                (MetricKind::Weight, log.weight),
                (
                    MetricKind::BodyFatPercent,
                    first([&log.body_fat, &log.body_fat_percentage]),
                ),
                (MetricKind::WaistCm, log.waist),
                (MetricKind::ChestCm, log.chest),
                (MetricKind::HipsCm, log.hips),
                (MetricKind::ArmCm, log.arm),
                (MetricKind::ThighCm, log.thigh),
                (MetricKind::NeckCm, log.neck),
            ];
            let mut any = false;
            for (kind, value) in fields {
                if let Some(v) = value {
                    emit(out, at, kind, v, &id);
                    any = true;
                }
            }
            any
        }
        RawRecord::Nutrition(log) => {
            let Some(at) = ts(log.timestamp()) else {
                return false;
            };
            let id = log.source_id();
            emit(out, at, MetricKind::Calories, log.calories.unwrap_or(0.0), &id);
            emit(out, at, MetricKind::Protein, log.protein.unwrap_or(0.0), &id);
            emit(out, at, MetricKind::Carbs, log.carbs().unwrap_or(0.0), &id);
            emit(out, at, MetricKind::Fats, log.fats.unwrap_or(0.0), &id);
            true
        }
        RawRecord::Hydration(log) => {
            let Some(at) = ts(log.timestamp()) else {
                return false;
            };
            let id = log.source_id();
            emit(out, at, MetricKind::WaterMl, log.amount_ml().unwrap_or(0.0), &id);
            true
        }
        RawRecord::Activity(log) => {
            let Some(at) = ts(log.timestamp()) else {
                return false;
            };
            let id = log.source_id();
            emit(
                out,
                at,
                MetricKind::CaloriesBurned,
                log.calories_burned().unwrap_or(0.0),
                &id,
            );
            emit(
                out,
                at,
                MetricKind::ActiveMinutes,
                log.duration_minutes().unwrap_or(0.0),
                &id,
            );
            true
        }
        RawRecord::Steps(log) => {
            let Some(at) = ts(log.date.clone()) else {
                return false;
            };
            emit(out, at, MetricKind::Steps, log.steps.unwrap_or(0.0), &log.user_id);
            if let Some(minutes) = log.duration_minutes() {
                emit(out, at, MetricKind::ActiveMinutes, minutes, &log.user_id);
            }
            true
        }
        RawRecord::Generic(metric) => {
            let Some(at) = ts(metric.timestamp()) else {
                return false;
            };
            let Some(kind) = metric
                .kind_name()
                .as_deref()
                .and_then(MetricKind::from_str_lossy)
            else {
                return false;
            };
            let value = match (metric.value, kind.is_cumulative()) {
                (Some(v), _) => v,
                (None, true) => 0.0,
                (None, false) => return false,
            };
            emit(out, at, kind, value, &metric.source_id());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn body_measurement_emits_one_record_per_field() {
        let raw = json!({
            "source": "body_measurement",
            "_id": 17,
            "measuredAt": "2025-01-05T08:00:00Z",
            "weight": 80.2,
            "bodyFat": "18.5",
            "waist": null
        });
        let report = normalize_json(&[raw], utc());
        assert_eq!(report.dropped, 0);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].kind, MetricKind::Weight);
        assert_eq!(report.records[1].value, 18.5);
        assert_eq!(report.records[0].source_id.as_deref(), Some("17"));
    }

    #[test]
    fn nutrition_defaults_missing_values_to_zero() {
        let raw = RawRecord::Nutrition(NutritionLog {
            consumed_at: Some("2025-01-05".into()),
            calories: Some(500.0),
            ..Default::default()
        });
        let report = normalize(&[raw], utc());
        assert_eq!(report.records.len(), 4);
        let protein = report
            .records
            .iter()
            .find(|r| r.kind == MetricKind::Protein)
            .unwrap();
        assert_eq!(protein.value, 0.0);
    }

    #[test]
    fn generic_point_in_time_without_value_is_dropped() {
        let raw = vec![
            json!({"source": "generic", "timestamp": "2025-01-05T10:00:00", "kind": "weight"}),
            json!({"source": "generic", "timestamp": "2025-01-05T10:00:00", "kind": "steps"}),
        ];
        let report = normalize_json(&raw, utc());
        assert_eq!(report.dropped, 1);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].kind, MetricKind::Steps);
        assert_eq!(report.records[0].value, 0.0);
    }

    #[test]
    fn malformed_entries_never_abort_the_batch() {
        let raw = vec![
            json!({"source": "hydration", "date": "yesterday", "volume": 250}),
            json!({"source": "generic", "timestamp": "2025-01-05", "kind": "mood", "value": 3}),
            json!({"source": "telepathy"}),
            json!("not even an object"),
            json!({"source": "body_measurement", "date": "2025-01-05"}),
            json!({"source": "hydration", "consumptionDate": "2025-01-05T09:00:00", "volume": 250}),
        ];
        let report = normalize_json(&raw, utc());
        assert_eq!(report.dropped, 5);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].kind, MetricKind::WaterMl);
    }

    #[test]
    fn output_is_sorted_and_stable() {
        let raw = vec![
            json!({"source": "generic", "id": "late", "timestamp": "2025-01-05T12:00:00", "kind": "weight", "value": 81}),
            json!({"source": "generic", "id": "a", "timestamp": "2025-01-05T08:00:00", "kind": "weight", "value": 80}),
            json!({"source": "generic", "id": "b", "timestamp": "2025-01-05T08:00:00", "kind": "weight", "value": 79}),
        ];
        let report = normalize_json(&raw, utc());
        let ids: Vec<_> = report
            .records
            .iter()
            .map(|r| r.source_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "late"]);
    }

    #[test]
    fn step_log_target_is_not_a_metric() {
        let raw = json!({"source": "steps", "userId": "u1", "date": "2025-01-05", "steps": 8000, "durationMinutes": 55, "target": 10000});
        let report = normalize_json(&[raw], utc());
        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().all(|r| r.value != 10000.0));
    }

    #[test]
    fn entries_with_several_spellings_of_a_key_are_kept() {
        let raw = vec![
            json!({"source": "body_measurement", "_id": "m1", "id": "legacy-1",
                   "measuredAt": "2025-01-05T08:00:00Z", "createdAt": "2025-01-06T10:00:00Z",
                   "weight": 80}),
            json!({"source": "nutrition", "consumptionDate": "2025-01-05T12:00:00Z",
                   "date": "2025-01-05", "calories": 500, "carbs": 60, "carbohydrates": 55}),
            json!({"source": "hydration", "date": "2025-01-05T09:00:00Z", "volume": 250, "amount": 300}),
            json!({"source": "generic", "timestamp": "2025-01-05T07:00:00Z", "date": "2025-01-05",
                   "kind": "weight", "type": "body", "value": 80.5}),
        ];
        let report = normalize_json(&raw, utc());
        assert_eq!(report.dropped, 0);

        let weight = report
            .records
            .iter()
            .find(|r| r.source_id.as_deref() == Some("m1"))
            .unwrap();
        assert_eq!(weight.timestamp.to_rfc3339(), "2025-01-05T08:00:00+00:00");

        let carbs = report
            .records
            .iter()
            .find(|r| r.kind == MetricKind::Carbs)
            .unwrap();
        assert_eq!(carbs.value, 60.0);

        let water = report
            .records
            .iter()
            .find(|r| r.kind == MetricKind::WaterMl)
            .unwrap();
        assert_eq!(water.value, 250.0);

        assert_eq!(
            report
                .records
                .iter()
                .filter(|r| r.kind == MetricKind::Weight)
                .count(),
            2
        );
    }
}
