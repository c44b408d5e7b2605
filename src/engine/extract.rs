//! Pulling one column value out of a document

use crate::document::value_at_path;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").unwrap());

/// Above this a numeric timestamp is taken to be in milliseconds
const MILLIS_THRESHOLD: f64 = 10_000_000_000.0;

const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Resolve a mapping's source path to a single column value.
///
/// Missing paths give `null`, arrays collapse to their first element (or
/// `null` when empty) and objects are stored as their JSON text.
pub fn extract_value(document: &Value, path: &str) -> Value {
    let value = match value_at_path(document, path) {
        Some(value) => value,
        None => return Value::Null,
    };

    let value = match value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Value::Null,
        },
        other => other,
    };

    match value {
        Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
        scalar => scalar.clone(),
    }
}

/// DATETIME, TIMESTAMP and DATE columns get timestamp normalization
pub fn is_date_time_type(sql_type: &str) -> bool {
    let lower = sql_type.to_lowercase();
    lower.contains("datetime") || lower.contains("timestamp") || lower == "date"
}

/// Best-effort conversion to `YYYY-MM-DD HH:MM:SS`.
///
/// ISO-8601-looking strings are trimmed to that shape; numbers are Unix
/// timestamps in seconds or milliseconds, rendered in UTC. Anything else is
/// passed through unchanged.
pub fn normalize_timestamp(value: Value) -> Value {
    match value {
        Value::String(s) if ISO_PREFIX.is_match(&s) => {
            let cleaned = s.replacen('T', " ", 1).replacen('Z', "", 1);
            Value::String(cleaned.chars().take(19).collect())
        }
        Value::Number(ref n) => {
            let Some(raw) = n.as_f64() else {
                return value;
            };
            let millis = if raw > MILLIS_THRESHOLD { raw } else { raw * 1000.0 };
            let millis = millis.trunc() as i64;
            let secs = millis.div_euclid(1000);
            let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
            match DateTime::from_timestamp(secs, nanos) {
                Some(dt) => Value::String(dt.format(SQL_DATETIME).to_string()),
                None => value,
            }
        }
        other => other,
    }
}
