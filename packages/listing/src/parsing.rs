//! Shared parsing helpers for API payloads.
//!
//! The API is loose about number types (ints, floats and numeric strings
//! all show up for the same field), so numeric fields are read through
//! [`lenient_f64`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads a JSON number or numeric string. Anything else is `None`.
#[must_use]
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Reads a JSON string or number as a string identifier.
#[must_use]
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `serde` adapter for optional numeric fields of uncertain type.
///
/// # Errors
///
/// Only fails when the underlying deserializer cannot produce a JSON value.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// `serde` adapter for optional text fields. Non-string values are `None`.
///
/// # Errors
///
/// Only fails when the underlying deserializer cannot produce a JSON value.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// `serde` adapter for optional flags. Anything but a JSON bool is `None`.
///
/// # Errors
///
/// Only fails when the underlying deserializer cannot produce a JSON value.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(Value::as_bool))
}

/// `serde` adapter for string lists. Non-string entries are dropped and a
/// value that is not an array is `None`.
///
/// # Errors
///
/// Only fails when the underlying deserializer cannot produce a JSON value.
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Parses an API timestamp by its date component.
///
/// The string must split on `T` into exactly a date part and a time part
/// (e.g., `"2023-05-01T12:00:00Z"`); anything else yields `None`.
#[must_use]
pub fn parse_api_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('T');
    let date = parts.next()?;
    parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

/// Whole days between `date` and `today`, floored at zero.
#[must_use]
pub fn day_delta(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days().max(0)
}

/// Day delta for an optional raw timestamp.
#[must_use]
pub fn days_since(raw: Option<&str>, today: NaiveDate) -> Option<i64> {
    raw.and_then(parse_api_date).map(|date| day_delta(date, today))
}

/// Converts an optional count to an integer, treating absent and zero as
/// `default`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn count_or(value: Option<f64>, default: i64) -> i64 {
    match value {
        Some(v) if v != 0.0 => v.trunc() as i64,
        _ => default,
    }
}

/// Upper-cases an optional string, empty when absent.
#[must_use]
pub fn upper_or_empty(value: Option<&str>) -> String {
    value.map(|s| s.trim().to_uppercase()).unwrap_or_default()
}
