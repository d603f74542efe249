//! Dotted-path lookups into the live payload.

use serde_json::Value;

/// Walk the payload along a dotted path, like `battery.power` or `batteries.0.stateOfCharge`.
///
/// Objects are indexed by key, arrays by a non-negative decimal index. Anything else along the way,
/// as well as a missing key or an out-of-range index, yields [`None`].
#[must_use]
pub fn extract<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(data, |value, segment| match value {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Numeric leaf at the path, if any.
#[must_use]
pub fn extract_f64(data: &Value, path: &str) -> Option<f64> {
    extract(data, path).and_then(Value::as_f64)
}

/// Only plain digits are accepted: `usize::from_str` would also take `+1`.
fn parse_index(segment: &str) -> Option<usize> {
    if !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}
