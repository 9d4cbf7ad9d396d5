//! Operand coercion.
//!
//! Field values arrive as JSON from the record store and expected values as
//! step parameters, usually strings. Comparisons therefore work on the
//! scalar string form of each side, reinterpreted as a date or number where
//! an operator needs ordering.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Natural scalar representation of a value.
///
/// Strings are taken as-is, `null` is empty, numbers and booleans use their
/// display form, and arrays and objects render as compact JSON.
pub fn string_form(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Non-null and non-empty.
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Parse a calendar date or timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`. Values without
/// an offset are taken as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a finite number from a JSON number or numeric string.
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Order two operands, dates first and numbers second.
///
/// `None` when the operands are neither both dates nor both numbers.
pub fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (
        parse_date(&string_form(actual)),
        parse_date(&string_form(expected)),
    ) {
        return Some(a.cmp(&b));
    }
    match (parse_number(actual), parse_number(expected)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => None,
    }
}

/// Equal string forms, or both numeric and numerically equal.
pub fn loose_eq(actual: &Value, expected: &Value) -> bool {
    if string_form(actual) == string_form(expected) {
        return true;
    }
    matches!(
        (parse_number(actual), parse_number(expected)),
        (Some(a), Some(b)) if a == b
    )
}

/// Alternatives of a `be one of` list, trimmed.
pub fn alternatives(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim)
}
