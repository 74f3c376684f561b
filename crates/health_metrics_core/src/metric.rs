use chrono::{DateTime, FixedOffset, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a day's worth of records for one kind collapse into a single value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Accrues over the day (calories eaten, steps walked): sum.
    Cumulative,
    /// A state at the moment of measurement (body weight): mean for past
    /// days, latest reading for today.
    PointInTime,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Weight,
    BodyFatPercent,
    WaistCm,
    ChestCm,
    HipsCm,
    ArmCm,
    ThighCm,
    NeckCm,
    Calories,
    Protein,
    Carbs,
    Fats,
    WaterMl,
    Steps,
    ActiveMinutes,
    CaloriesBurned,
}

impl MetricKind {
    pub const ALL: [MetricKind; 16] = [
        MetricKind::Weight,
        MetricKind::BodyFatPercent,
        MetricKind::WaistCm,
        MetricKind::ChestCm,
        MetricKind::HipsCm,
        MetricKind::ArmCm,
        MetricKind::ThighCm,
        MetricKind::NeckCm,
        MetricKind::Calories,
        MetricKind::Protein,
        MetricKind::Carbs,
        MetricKind::Fats,
        MetricKind::WaterMl,
        MetricKind::Steps,
        MetricKind::ActiveMinutes,
        MetricKind::CaloriesBurned,
    ];

    pub fn reduction(self) -> Reduction {
        match self {
            MetricKind::Weight
            | MetricKind::BodyFatPercent
            | MetricKind::WaistCm
            | MetricKind::ChestCm
            | MetricKind::HipsCm
            | MetricKind::ArmCm
            | MetricKind::ThighCm
            | MetricKind::NeckCm => Reduction::PointInTime,
            MetricKind::Calories
            | MetricKind::Protein
            | MetricKind::Carbs
            | MetricKind::Fats
            | MetricKind::WaterMl
            | MetricKind::Steps
            | MetricKind::ActiveMinutes
            | MetricKind::CaloriesBurned => Reduction::Cumulative,
        }
    }

    pub fn is_cumulative(self) -> bool {
        self.reduction() == Reduction::Cumulative
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Weight => "weight",
            MetricKind::BodyFatPercent => "body_fat_percent",
            MetricKind::WaistCm => "waist_cm",
            MetricKind::ChestCm => "chest_cm",
            MetricKind::HipsCm => "hips_cm",
            MetricKind::ArmCm => "arm_cm",
            MetricKind::ThighCm => "thigh_cm",
            MetricKind::NeckCm => "neck_cm",
            MetricKind::Calories => "calories",
            MetricKind::Protein => "protein",
            MetricKind::Carbs => "carbs",
            MetricKind::Fats => "fats",
            MetricKind::WaterMl => "water_ml",
            MetricKind::Steps => "steps",
            MetricKind::ActiveMinutes => "active_minutes",
            MetricKind::CaloriesBurned => "calories_burned",
        }
    }

    /// Lenient lookup accepting the canonical snake_case name plus the
    /// spellings the record sources use. Unknown names yield `None`.
    pub fn from_str_lossy(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let kind = match lower.as_str() {
            "weight" => MetricKind::Weight,
            "body_fat_percent" | "body_fat" | "bodyfat" | "body_fat_percentage" => {
                MetricKind::BodyFatPercent
            }
            "waist_cm" | "waist" => MetricKind::WaistCm,
            "chest_cm" | "chest" => MetricKind::ChestCm,
            "hips_cm" | "hips" | "hip" => MetricKind::HipsCm,
            "arm_cm" | "arm" | "arms" => MetricKind::ArmCm,
            "thigh_cm" | "thigh" | "thighs" => MetricKind::ThighCm,
            "neck_cm" | "neck" => MetricKind::NeckCm,
            "calories" | "kcal" => MetricKind::Calories,
            "protein" => MetricKind::Protein,
            "carbs" | "carbohydrates" => MetricKind::Carbs,
            "fats" | "fat" => MetricKind::Fats,
            "water_ml" | "water" | "hydration" => MetricKind::WaterMl,
            "steps" => MetricKind::Steps,
            "active_minutes" | "duration" => MetricKind::ActiveMinutes,
            "calories_burned" | "burned" => MetricKind::CaloriesBurned,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricKind {
    type Err = crate::MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_lossy(s)
            .ok_or_else(|| crate::MetricsError::InvalidArgument(format!("unknown metric kind: {s}")))
    }
}

/// Canonical record produced by the normalizer. Never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricRecord {
    /// Timestamp already shifted into the user's local offset.
    pub timestamp: DateTime<FixedOffset>,
    pub kind: MetricKind,
    pub value: f64,
    pub source_id: Option<String>,
}

impl MetricRecord {
    pub fn new(timestamp: DateTime<FixedOffset>, kind: MetricKind, value: f64) -> Self {
        Self {
            timestamp,
            kind,
            value,
            source_id: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Local calendar date of the record, taken in the timestamp's own offset.
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Calendar date of the record as seen from `offset`.
    pub fn date_in(&self, offset: &FixedOffset) -> NaiveDate {
        self.timestamp.with_timezone(offset).date_naive()
    }
}
