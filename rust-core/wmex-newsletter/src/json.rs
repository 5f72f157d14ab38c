// SPDX-License-Identifier: PMPL-1.0-or-later

//! Defaulting field projection over partially-populated JSON trees.
//!
//! Every helper takes a key path and treats a missing key, a `null`, or a
//! non-object at any hop as "absent". None of them can fail.

use serde_json::Value;

/// Value at `path`, or `None` if any hop is missing or the value is `null`.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// String at `path`. Numbers and booleans are rendered as text.
pub fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like [`text_at`], but an empty string counts as absent.
pub fn non_empty_text_at(value: &Value, path: &[&str]) -> Option<String> {
    text_at(value, path).filter(|s| !s.is_empty())
}

/// Integer at `path`, defaulting to 0.
///
/// Strings are parsed base 10 from their leading digits (`"12abc"` is 12);
/// floats are truncated.
pub fn int_at(value: &Value, path: &[&str]) -> i64 {
    lookup(value, path).map(coerce_int).unwrap_or(0)
}

/// Non-negative integer at `path`, defaulting to 0.
pub fn count_at(value: &Value, path: &[&str]) -> u64 {
    u64::try_from(int_at(value, path)).unwrap_or(0)
}

fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => parse_int(s),
        _ => 0,
    }
}

/// Base-10 parse of the leading integer in `s`; 0 when there is none or it
/// overflows.
pub fn parse_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) => 0,
    }
}
