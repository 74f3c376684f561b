//! Calorie and macro progress against the user's nutrition target.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::daily::DailyAggregate;
use crate::metric::MetricKind;
use crate::utils::round1;

/// Calorie target used when the user never set one.
pub const DEFAULT_TARGET_CALORIES: f64 = 2200.0;

/// Per-user target; every field is independently optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NutritionTarget {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub fats: Option<f64>,
}

impl NutritionTarget {
    pub fn calories_or(&self, fallback: f64) -> f64 {
        self.calories.unwrap_or(fallback)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MacroActuals {
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
}

/// Today's consumed/burned totals as the dashboard needs them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyTotals {
    pub consumed_calories: f64,
    pub burned_calories: f64,
    pub macros: MacroActuals,
}

impl DailyTotals {
    /// Missing kinds count as zero.
    pub fn from_aggregate(day: &DailyAggregate) -> Self {
        let v = |k: MetricKind| day.value(k).unwrap_or(0.0);
        Self {
            consumed_calories: v(MetricKind::Calories),
            burned_calories: v(MetricKind::CaloriesBurned),
            macros: MacroActuals {
                carbs: v(MetricKind::Carbs),
                protein: v(MetricKind::Protein),
                fats: v(MetricKind::Fats),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalorieSummary {
    pub consumed: f64,
    pub burned: f64,
    /// Consumed minus burned; negative when exercise outweighs intake.
    pub net: f64,
    pub target: f64,
    /// Never negative.
    pub remaining: f64,
    pub achieved: f64,
    /// Whole percent in 0..=100.
    pub progress_percentage: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MacroProgress {
    pub consumed: f64,
    /// Zero when the user has not set a target for this macro.
    pub target: f64,
    pub has_target: bool,
    pub remaining: f64,
    pub progress_percentage: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NutritionSummary {
    pub calories: CalorieSummary,
    pub carbs: MacroProgress,
    pub protein: MacroProgress,
    pub fats: MacroProgress,
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole * 100.0).clamp(0.0, 100.0).round()
    } else {
        0.0
    }
}

pub fn derive_nutrition_summary(consumed: f64, burned: f64, target: f64) -> CalorieSummary {
    let net = consumed - burned;
    let remaining = (target - net).max(0.0);
    let achieved = target - remaining;
    CalorieSummary {
        consumed,
        burned,
        net,
        target,
        remaining,
        achieved,
        progress_percentage: percentage(achieved, target),
    }
}

pub fn macro_progress(consumed: f64, target: Option<f64>) -> MacroProgress {
    let t = target.unwrap_or(0.0);
    MacroProgress {
        consumed: round1(consumed),
        target: t,
        has_target: target.is_some(),
        remaining: (t - consumed).max(0.0),
        progress_percentage: percentage(consumed, t),
    }
}

/// Full dashboard summary. A missing target, or a target without calories,
/// falls back to `default_calories`; macros without a target report 0.
pub fn derive_full_summary(
    totals: &DailyTotals,
    target: Option<&NutritionTarget>,
    default_calories: f64,
) -> NutritionSummary {
    let fallback = NutritionTarget::default();
    let target = target.unwrap_or(&fallback);
    NutritionSummary {
        calories: derive_nutrition_summary(
            totals.consumed_calories,
            totals.burned_calories,
            target.calories_or(default_calories),
        ),
        carbs: macro_progress(totals.macros.carbs, target.carbs),
        protein: macro_progress(totals.macros.protein, target.protein),
        fats: macro_progress(totals.macros.fats, target.fats),
    }
}
