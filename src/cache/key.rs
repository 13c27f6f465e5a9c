//! Cache key construction
//!
//! A key is an ordered tuple `[..base, page, limit, filters?]`. Two requests
//! hit the same entry iff their tuples are equal.

use crate::filters::normalize_filters;
use crate::types::{Filters, JsonValue};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One element of a query key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// Base identifier segment
    Str(String),
    /// Page number or limit
    Int(u64),
    /// Normalized filter object
    Filters(Filters),
}

impl Hash for KeyPart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Str(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Self::Int(n) => {
                1u8.hash(state);
                n.hash(state);
            }
            Self::Filters(filters) => {
                2u8.hash(state);
                hash_object(filters, state);
            }
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<u32> for KeyPart {
    fn from(n: u32) -> Self {
        Self::Int(u64::from(n))
    }
}

// Key order is canonicalized so hashing agrees with map equality regardless
// of the map's iteration order.
fn hash_object<H: Hasher>(map: &Filters, state: &mut H) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys.len().hash(state);
    for key in keys {
        key.hash(state);
        if let Some(value) = map.get(key) {
            hash_value(value, state);
        }
    }
}

fn hash_value<H: Hasher>(value: &JsonValue, state: &mut H) {
    match value {
        JsonValue::Null => 0u8.hash(state),
        JsonValue::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        JsonValue::Number(n) => {
            2u8.hash(state);
            n.to_string().hash(state);
        }
        JsonValue::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        JsonValue::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        JsonValue::Object(map) => {
            5u8.hash(state);
            hash_object(map, state);
        }
    }
}

/// Ordered cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Key made of base identifier segments only
    pub fn base<S: AsRef<str>>(parts: &[S]) -> Self {
        Self(parts.iter().map(|p| KeyPart::from(p.as_ref())).collect())
    }

    /// Key from raw parts
    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Append a part
    #[must_use]
    pub fn push(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Parts in order
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Check whether `prefix` is a leading sub-tuple of this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the key has no parts
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// Build the key for one page of a query
///
/// The filter part is omitted when no filter survives normalization.
pub fn create_query_key(
    base: &QueryKey,
    page: u32,
    limit: u32,
    filters: Option<&Filters>,
) -> QueryKey {
    let key = base.clone().push(page).push(limit);
    match normalize_filters(filters) {
        Some(normalized) => key.push(KeyPart::Filters(normalized)),
        None => key,
    }
}
