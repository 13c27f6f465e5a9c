//! Structural equality over JSON values
//!
//! Used to detect whether caller-supplied filters changed between updates.
//! Numbers compare by value, so `1` and `1.0` are equal.

use crate::types::{Filters, JsonValue};
use serde_json::Number;

/// Deep structural equality
///
/// Objects are equal iff they have the same key set and every value is
/// recursively equal. `null` never equals a non-null value.
pub fn deep_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x == y,
        (JsonValue::Number(x), JsonValue::Number(y)) => numbers_equal(x, y),
        (JsonValue::String(x), JsonValue::String(y)) => x == y,
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => objects_equal(x, y),
        _ => false,
    }
}

/// Compare two optional filter maps
pub fn deep_equal_filters(a: Option<&Filters>, b: Option<&Filters>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => objects_equal(x, y),
        _ => false,
    }
}

fn objects_equal(a: &Filters, b: &Filters) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| deep_equal(value, other)))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        #[allow(clippy::float_cmp)]
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
