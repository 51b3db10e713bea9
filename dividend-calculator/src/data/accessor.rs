//! Null-tolerant lookups into loosely-typed JSON documents.
//!
//! Provider documents have no guaranteed schema. Every read of an
//! externally sourced field goes through [`safe_get`], which walks a path of
//! object keys and array indices and yields `None` the moment a step is
//! missing, has the wrong type, is out of range, or lands on `null`.

use serde_json::Value;

/// Apply one path segment to a value.
///
/// Objects are indexed by key. Arrays are indexed by the segment parsed as
/// a `usize`. Anything else is a miss.
fn step<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Walk `path` from `value`. `null` at the end of the path counts as absent.
pub fn safe_get<'v, S: AsRef<str>>(value: &'v Value, path: &[S]) -> Option<&'v Value> {
    path.iter()
        .try_fold(value, |current, segment| step(current, segment.as_ref()))
        .filter(|leaf| !leaf.is_null())
}

/// [`safe_get`] narrowed to a number.
pub fn safe_get_f64<S: AsRef<str>>(value: &Value, path: &[S]) -> Option<f64> {
    safe_get(value, path).and_then(Value::as_f64)
}

/// [`safe_get`] narrowed to an integer. Floats with no fractional part are accepted.
pub fn safe_get_i64<S: AsRef<str>>(value: &Value, path: &[S]) -> Option<i64> {
    let leaf = safe_get(value, path)?;
    leaf.as_i64().or_else(|| {
        leaf.as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

/// [`safe_get`] narrowed to a string.
pub fn safe_get_str<'v, S: AsRef<str>>(value: &'v Value, path: &[S]) -> Option<&'v str> {
    safe_get(value, path).and_then(Value::as_str)
}
