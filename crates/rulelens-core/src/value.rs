//! Coercion rules of the rule language.
//!
//! These mirror the loose semantics rule authors expect from JSON Logic:
//! truthiness treats `0`, `""`, `[]`, `null` and `false` as false, arithmetic
//! coerces operands to numbers, and comparisons are numeric unless both sides
//! are strings.

use serde_json::{Number, Value};
use std::cmp::Ordering;

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// Numeric coercion. Returns NaN for values with no numeric reading.
///
/// `null` and `""` are 0, booleans are 1/0, strings are parsed after trimming,
/// arrays go through their string form (`[]` is 0, `[5]` is 5), objects are NaN.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) => parse_number(&to_display_string(value)),
        Value::Object(_) => f64::NAN,
    }
}

fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("inf") || lower.contains("nan") {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number result as JSON: integral values become integers, NaN and
/// infinities become `null`.
pub fn number_value(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        return Value::Number(Number::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// String form used by concatenation and string comparison.
///
/// Inside arrays `null` renders empty, matching how joined lists read.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Collapse arrays and objects to their string form; scalars stay as they are.
fn primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(to_display_string(value)),
        other => other.clone(),
    }
}

/// Loose equality (`==`).
///
/// `null` only equals `null`. Numbers against strings or booleans compare
/// numerically. Arrays and objects compare structurally against their own
/// kind and by string form against scalars.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::Number(_)) => to_number(a) == to_number(b),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            loose_eq(&number_or_null(to_number(a)), &number_or_null(to_number(b)))
        }
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        _ => loose_eq(&primitive(a), &primitive(b)),
    }
}

fn number_or_null(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Strict equality, used for array membership.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering for `<`, `<=`, `>`, `>=`: string order when both sides are
/// strings, numeric otherwise. `None` when either side is not a number.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let (a, b) = (primitive(a), primitive(b));
    if let (Value::String(x), Value::String(y)) = (&a, &b) {
        return Some(x.cmp(y));
    }
    to_number(&a).partial_cmp(&to_number(&b))
}
