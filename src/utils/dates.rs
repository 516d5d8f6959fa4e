//! Date parsing for CSV rows, CLI bounds and feed timestamps.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Twitter's first public day; the feed holds nothing earlier.
pub const TWITTER_EPOCH: &str = "2006-03-21";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp as written in an archive's `date` column.
///
/// Accepts ISO-8601 with or without offset (offsets are normalised to UTC)
/// and bare dates, which map to midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a `--since`/`--until` style bound down to its calendar day.
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    parse_timestamp(value).map(|dt| dt.date()).ok_or_else(|| Error::InvalidDate(value.to_string()))
}

/// Format a timestamp the way feed records are persisted.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn next_day(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(day)
}

pub fn previous_day(day: NaiveDate) -> NaiveDate {
    day.checked_sub_days(Days::new(1)).unwrap_or(day)
}

pub fn twitter_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2006, 3, 21).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_and_space_separated_timestamps() {
        let a = parse_timestamp("2016-05-01T12:34:56").expect("iso");
        let b = parse_timestamp("2016-05-01 12:34:56").expect("space");
        assert_eq!(a, b);
        assert_eq!(format_timestamp(&a), "2016-05-01T12:34:56");
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let dt = parse_timestamp("2016-05-01T01:00:00+02:00").expect("offset");
        assert_eq!(format_timestamp(&dt), "2016-04-30T23:00:00");
    }

    #[test]
    fn bare_date_maps_to_midnight() {
        let dt = parse_timestamp("2016-05-01").expect("date");
        assert_eq!(format_timestamp(&dt), "2016-05-01T00:00:00");
    }

    #[test]
    fn parse_day_rejects_garbage() {
        assert!(parse_day("yesterday-ish").is_err());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn day_arithmetic() {
        let day = parse_day("2016-03-01").expect("day");
        assert_eq!(previous_day(day).to_string(), "2016-02-29");
        assert_eq!(next_day(previous_day(day)), day);
        assert_eq!(twitter_epoch().to_string(), TWITTER_EPOCH);
    }
}
