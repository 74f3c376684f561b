//! Utility functions for timestamp parsing and rounding.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// Parse a source timestamp into the user's local offset.
///
/// Accepts:
/// - RFC3339 datetime -> converted into `local`
/// - Naive datetime YYYY-MM-DDTHH:MM:SS (or with a space, optional fraction) -> taken as local
/// - YYYY-MM-DD -> local midnight
pub fn parse_local_timestamp(s: &str, local: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&local));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return local.from_local_datetime(&ndt).single();
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local.from_local_datetime(&d.and_hms_opt(0, 0, 0)?).single();
    }
    None
}

/// Parse a YYYY-MM-DD calendar date, also accepting a full timestamp and
/// keeping its local date part.
pub fn parse_date_key(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.date_naive())
}

/// Format a calendar date as the YYYY-MM-DD key used for storage and display.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Round half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn parse_accepts_date_only() {
        let ts = parse_local_timestamp("2025-12-15", utc()).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-12-15T00:00:00+00:00");
    }

    #[test]
    fn parse_shifts_rfc3339_into_local_offset() {
        let plus2 = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = parse_local_timestamp("2025-01-10T23:30:00Z", plus2).unwrap();
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 11).unwrap());
    }

    #[test]
    fn parse_keeps_naive_datetime_as_local() {
        let minus5 = FixedOffset::west_opt(5 * 3600).unwrap();
        let ts = parse_local_timestamp("2025-12-15 10:30:00.250", minus5).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-12-15T10:30:00.250-05:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_local_timestamp("not-a-date", utc()).is_none());
        assert!(parse_local_timestamp("", utc()).is_none());
    }

    #[test]
    fn date_key_round_trip() {
        let d = parse_date_key("2024-12-30T08:00:00+01:00").unwrap();
        assert_eq!(date_key(d), "2024-12-30");
        assert!(parse_date_key("12/30/2024").is_none());
    }

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert_eq!(round1(70.2333), 70.2);
        assert_eq!(round1(0.7000000000000028), 0.7);
        assert_eq!(round1(-1.25), -1.3);
    }
}
