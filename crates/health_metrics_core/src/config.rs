use crate::MetricsError;
use crate::nutrition::DEFAULT_TARGET_CALORIES;
use chrono::{FixedOffset, Offset, Utc};

pub const DEFAULT_NOTIFICATION_TITLE: &str = "Daily goal reached";
pub const DEFAULT_NOTIFICATION_BODY: &str =
    "You hit your calorie and macro targets today. Nice work!";

#[derive(Clone, Debug)]
pub struct Config {
    pub user_id: String,
    pub default_target_calories: f64,
    /// Offset used to derive local calendar dates.
    pub utc_offset: FixedOffset,
    pub notification_title: String,
    pub notification_body: String,
}

impl Config {
    pub fn from_env() -> Result<Self, MetricsError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, MetricsError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let user_id = get("HEALTH_METRICS_USER_ID")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| MetricsError::Config("HEALTH_METRICS_USER_ID missing".into()))?;

        let default_target_calories = match get("HEALTH_METRICS_DEFAULT_TARGET_CALORIES") {
            Some(raw) => {
                let v: f64 = raw.trim().parse().map_err(|_| {
                    MetricsError::Config(format!(
                        "HEALTH_METRICS_DEFAULT_TARGET_CALORIES not a number: {raw}"
                    ))
                })?;
                if !(v.is_finite() && v > 0.0) {
                    return Err(MetricsError::Config(
                        "HEALTH_METRICS_DEFAULT_TARGET_CALORIES must be positive".into(),
                    ));
                }
                v
            }
            None => DEFAULT_TARGET_CALORIES,
        };

        let utc_offset = match get("HEALTH_METRICS_UTC_OFFSET") {
            Some(raw) => raw.trim().parse::<FixedOffset>().map_err(|_| {
                MetricsError::Config(format!("HEALTH_METRICS_UTC_OFFSET invalid: {raw}"))
            })?,
            None => utc(),
        };

        Ok(Self {
            user_id,
            default_target_calories,
            utc_offset,
            notification_title: get("HEALTH_METRICS_NOTIFICATION_TITLE")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.into()),
            notification_body: get("HEALTH_METRICS_NOTIFICATION_BODY")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY.into()),
        })
    }

    /// Configuration for a single user with every optional value defaulted.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            default_target_calories: DEFAULT_TARGET_CALORIES,
            utc_offset: utc(),
            notification_title: DEFAULT_NOTIFICATION_TITLE.into(),
            notification_body: DEFAULT_NOTIFICATION_BODY.into(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}
