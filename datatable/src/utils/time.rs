//! Timestamp normalization for date filters

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a date-like value into a UTC timestamp
///
/// Accepts RFC 3339 strings, naive date-times (assumed UTC), plain dates
/// (midnight UTC) and integer milliseconds since the Unix epoch.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize a date-like value to a canonical timestamp string
///
/// The canonical form is ISO 8601 in UTC with millisecond precision
/// (`2024-01-01T00:00:00.000Z`), so string and date storage compare
/// consistently. Values that cannot be parsed are returned unchanged.
pub fn normalize_timestamp(value: &Value) -> Value {
    match parse_timestamp(value) {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => value.clone(),
    }
}

/// Short human-readable date (`Jan 5`) used in filter labels
pub fn format_short_date(value: &Value) -> Option<String> {
    parse_timestamp(value).map(|dt| dt.format("%b %-d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_rfc3339_with_offset() {
        let value = json!("2024-03-10T12:30:00+02:00");
        assert_eq!(
            normalize_timestamp(&value),
            json!("2024-03-10T10:30:00.000Z")
        );
    }

    #[test]
    fn test_normalize_plain_date() {
        assert_eq!(
            normalize_timestamp(&json!("2024-01-01")),
            json!("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_normalize_naive_datetime() {
        assert_eq!(
            normalize_timestamp(&json!("2024-01-01 08:15:00")),
            json!("2024-01-01T08:15:00.000Z")
        );
    }

    #[test]
    fn test_normalize_epoch_millis() {
        // 2024-01-01 00:00:00 UTC = 1704067200 seconds
        assert_eq!(
            normalize_timestamp(&json!(1_704_067_200_000_i64)),
            json!("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_normalize_unparseable_passthrough() {
        assert_eq!(normalize_timestamp(&json!("soon")), json!("soon"));
        assert_eq!(normalize_timestamp(&json!(true)), json!(true));
    }

    #[test]
    fn test_format_short_date() {
        assert_eq!(
            format_short_date(&json!("2024-01-05T10:00:00Z")),
            Some("Jan 5".to_string())
        );
        assert_eq!(format_short_date(&json!("nope")), None);
    }
}
