//! Timestamp and date helpers.
//!
//! Timestamps are stored as UTC `YYYY-MM-DD HH:MM:SS` text so SQLite's
//! `datetime('now')` defaults and lexical ordering both work.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::CoreError;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Parse a stored timestamp. Also accepts the `T`-separated and RFC 3339 forms
/// clients tend to send.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, CoreError> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .map_err(|_| CoreError::InvalidTimestamp(raw.to_string()))
}

/// Parse a `YYYY-MM-DD` date. A full timestamp is accepted and truncated to its date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(d);
    }
    parse_datetime(raw)
        .map(|dt| dt.date())
        .map_err(|_| CoreError::InvalidDate(raw.to_string()))
}

/// Number of calendar days in `[from, to]`, counting both ends.
pub fn inclusive_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days() + 1
}

/// Iterate every date in `[from, to]`.
pub fn each_day(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_datetime_forms() {
        let expected = date("2024-03-05").and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-05 10:30:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-03-05T10:30:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-03-05T12:30:00+02:00").unwrap(), expected);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_parse_date_truncates_timestamps() {
        assert_eq!(parse_date("2024-03-05").unwrap(), date("2024-03-05"));
        assert_eq!(parse_date("2024-03-05 23:59:59").unwrap(), date("2024-03-05"));
        assert_eq!(
            parse_date("03/05/2024"),
            Err(CoreError::InvalidDate("03/05/2024".into()))
        );
    }

    #[test]
    fn test_each_day_is_inclusive() {
        let days: Vec<_> = each_day(date("2024-02-28"), date("2024-03-01")).collect();
        assert_eq!(
            days,
            vec![date("2024-02-28"), date("2024-02-29"), date("2024-03-01")]
        );
        assert_eq!(inclusive_days(date("2024-02-28"), date("2024-03-01")), 3);
        assert_eq!(each_day(date("2024-03-02"), date("2024-03-01")).count(), 0);
    }
}
