use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("failed to parse {field}"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Serializes an embedded structure (exercise lists) into a TEXT column.
pub fn to_json_column<T: Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to encode {field}"))
}

pub fn from_json_column<T: DeserializeOwned>(value: &str, field: &str) -> Result<T> {
    serde_json::from_str(value).with_context(|| format!("failed to decode {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_round_trips_through_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_date(date), "2024-03-09");
        assert_eq!(parse_date("2024-03-09", "d").unwrap(), date);
    }

    #[test]
    fn negative_integers_are_rejected() {
        assert!(to_u64(-1, "duration_seconds").is_err());
        assert_eq!(to_u64(42, "duration_seconds").unwrap(), 42);
    }
}
