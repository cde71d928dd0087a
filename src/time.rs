//! Timestamp parsing and formatting
//!
//! Backend rows carry SQLite-style `YYYY-MM-DD HH:MM:SS` timestamps while other
//! collaborators send ISO-8601 with a `T` separator. Both are accepted: the
//! first space is rewritten to `T` and a single parse path is applied.

use crate::error::ComputeError;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};

/// Parse a space- or `T`-separated timestamp into UTC.
///
/// Values without an offset are taken as UTC. A bare date parses as midnight.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ComputeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ComputeError::DateParseError("empty timestamp".to_string()));
    }
    let canonical = trimmed.replacen(' ', "T", 1);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&canonical) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Hour-only and colon-less offsets (`+00`, `+0200`), minute precision
    let offset_form = match canonical.strip_suffix(|c: char| c.eq_ignore_ascii_case(&'Z')) {
        Some(head) => format!("{head}+00:00"),
        None => canonical.clone(),
    };
    for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(&offset_form, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&canonical, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&canonical, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(ComputeError::DateParseError(format!(
        "unrecognised timestamp '{trimmed}'"
    )))
}

/// Format a timestamp the way the backend stores it (`YYYY-MM-DD HH:MM:SS`, UTC)
pub fn format_storage_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fixed offset for display and day bucketing; out-of-range values fall back to UTC
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Chart label for a single point (`dd/mm HH:MM`)
pub fn format_point_label(ts: &DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format("%d/%m %H:%M").to_string()
}

/// Chart label for a calendar day (`dd/mm`)
pub fn format_day_label(date: &NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// Calendar day of `ts` as seen at `offset`
pub fn local_day(ts: &DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Start of `date` at `offset`, expressed in UTC
pub fn day_start_utc(date: &NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match offset.from_local_datetime(&midnight).single() {
        Some(local) => local.with_timezone(&Utc),
        None => midnight.and_utc(),
    }
}

/// Elapsed time from `ts` to `now` (negative for future timestamps)
pub fn age(now: DateTime<Utc>, ts: DateTime<Utc>) -> Duration {
    now.signed_duration_since(ts)
}

/// Absolute distance between two instants
pub fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    let delta = a.signed_duration_since(b);
    if delta < Duration::zero() {
        -delta
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_space_and_t_separators_are_equivalent() {
        let spaced = parse_timestamp("2024-03-10 14:25:00").unwrap();
        let iso = parse_timestamp("2024-03-10T14:25:00").unwrap();
        assert_eq!(spaced, iso);
        assert_eq!(spaced.hour(), 14);
        assert_eq!(spaced.minute(), 25);
    }

    #[test]
    fn test_offsets_and_fractions() {
        let zulu = parse_timestamp("2024-03-10T14:25:00.250Z").unwrap();
        assert_eq!(zulu.timestamp_subsec_millis(), 250);

        let shifted = parse_timestamp("2024-03-10 16:25:00+02:00").unwrap();
        assert_eq!(shifted, parse_timestamp("2024-03-10 14:25:00").unwrap());
    }

    #[test]
    fn test_short_and_colonless_offsets() {
        let expected = parse_timestamp("2024-03-10 14:25:00").unwrap();

        assert_eq!(parse_timestamp("2024-03-10 14:25:00+00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-10T16:25:00+0200").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-10T09:25:00-05").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-10T14:25Z").unwrap(), expected);

        let fractional = parse_timestamp("2024-03-10 14:25:00.123456+00").unwrap();
        assert_eq!(fractional.timestamp_subsec_micros(), 123_456);
        assert_eq!(fractional.timestamp(), expected.timestamp());
    }

    #[test]
    fn test_bare_date_and_minutes() {
        let date = parse_timestamp("2024-03-10").unwrap();
        assert_eq!((date.day(), date.hour()), (10, 0));

        let minutes = parse_timestamp("2024-03-10 08:05").unwrap();
        assert_eq!((minutes.hour(), minutes.minute()), (8, 5));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-40 10:00:00").is_err());
    }

    #[test]
    fn test_labels_respect_offset() {
        let ts = parse_timestamp("2024-03-10 23:30:00").unwrap();
        assert_eq!(format_point_label(&ts, offset_from_minutes(0)), "10/03 23:30");
        assert_eq!(format_point_label(&ts, offset_from_minutes(60)), "11/03 00:30");
        assert_eq!(local_day(&ts, offset_from_minutes(60)).day(), 11);
    }

    #[test]
    fn test_day_start_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let start = day_start_utc(&date, offset_from_minutes(60));
        assert_eq!(format_storage_timestamp(&start), "2024-03-10 23:00:00");
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        assert_eq!(offset_from_minutes(48 * 60), Utc.fix());
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = parse_timestamp("2024-03-10 10:00:00").unwrap();
        let b = parse_timestamp("2024-03-10 10:20:00").unwrap();
        assert_eq!(distance(a, b), distance(b, a));
        assert_eq!(distance(a, b), Duration::minutes(20));
        assert_eq!(age(b, a), Duration::minutes(20));
    }
}
