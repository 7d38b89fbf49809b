//! Field lookup over loosely typed JSON records.
//!
//! Monitoring APIs disagree on casing and on whether numbers arrive as JSON
//! numbers or as strings. Every lookup takes an explicit precedence list and
//! returns the first key that carries a usable value.

use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

/// Reads a number from a JSON number or a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Reads an identity string. Numbers are accepted and formatted; empty strings
/// count as absent.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn first_number(record: &Record, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| record.get(*k).and_then(as_number))
}

pub fn first_text(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| record.get(*k).and_then(as_text))
}

/// True when the key holds something other than null or an empty string.
pub fn is_present(record: &Record, key: &str) -> bool {
    match record.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}
