//! Filter normalization
//!
//! Semantically empty filters collapse to `None` so that "no filters" and
//! "filters present but all empty" address the same cache entry.

use crate::types::{Filters, JsonValue};

/// Strip null and empty-string values.
///
/// Returns `None` when nothing survives. Idempotent.
pub fn normalize_filters(filters: Option<&Filters>) -> Option<Filters> {
    let normalized: Filters = filters?
        .iter()
        .filter(|(_, value)| !is_empty_value(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Check whether any filter survives normalization
pub fn has_active_filters(filters: Option<&Filters>) -> bool {
    filters.is_some_and(|f| f.values().any(|v| !is_empty_value(v)))
}

fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Parse `key=value` pairs into a filter map.
///
/// Values that parse as JSON scalars keep their type, anything else is
/// stored as a string.
pub fn parse_filter_pairs<S: AsRef<str>>(pairs: &[S]) -> crate::Result<Filters> {
    let mut filters = Filters::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            crate::Error::invalid_value("filter", format!("expected key=value, got '{pair}'"))
        })?;
        let value = match serde_json::from_str::<JsonValue>(value) {
            Ok(v) if !v.is_object() && !v.is_array() => v,
            _ => JsonValue::String(value.to_string()),
        };
        filters.insert(key.trim().to_string(), value);
    }
    Ok(filters)
}
