//! Query configuration types

use crate::error::{Error, Result};
use crate::pagination::PaginationRequest;
use crate::types::{Filters, JsonValue, SortDirection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Comparison applied by a filter clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal (numbers by value, other scalars by string form)
    #[default]
    Eq,
    /// Case-insensitive substring match
    Like,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// Member of an array of values
    In,
    /// Null / boolean identity check
    Is,
}

impl FilterOperator {
    /// Parse an operator name
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "like" => Ok(Self::Like),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "is" => Ok(Self::Is),
            other => Err(Error::query(format!("unknown filter operator '{other}'"))),
        }
    }
}

/// One filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Field name; dots address nested fields
    pub field: String,
    /// Comparison to apply
    #[serde(default)]
    pub operator: FilterOperator,
    /// Operand
    pub value: JsonValue,
}

impl FilterClause {
    /// Create a filter clause
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<JsonValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Create an equality clause
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    /// Field name; dots address nested fields
    pub field: String,
    /// Direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortClause {
    /// Ascending sort on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `field` or `-field`
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(raw.trim_start_matches('+')),
        }
    }
}

fn default_cursor_field() -> String {
    "created_at".to_string()
}

/// Filters, sorts, projection and pagination for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Fields to keep on each record; empty keeps everything
    #[serde(default)]
    pub includes: Vec<String>,
    /// Conditions, all of which must hold
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    /// Sort keys, most significant first
    #[serde(default)]
    pub sorts: Vec<SortClause>,
    /// Page request; `None` returns every match
    #[serde(default)]
    pub pagination: Option<PaginationRequest>,
    /// Field compared against the cursor in cursor mode
    #[serde(default = "default_cursor_field")]
    pub cursor_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
            pagination: None,
            cursor_field: default_cursor_field(),
        }
    }
}

impl QueryConfig {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter clause
    #[must_use]
    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    /// Add a sort clause
    #[must_use]
    pub fn sort(mut self, clause: SortClause) -> Self {
        self.sorts.push(clause);
        self
    }

    /// Set the projection
    #[must_use]
    pub fn include<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.includes = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the page request
    #[must_use]
    pub fn paginate(mut self, request: PaginationRequest) -> Self {
        self.pagination = Some(request);
        self
    }

    /// Set the cursor field
    #[must_use]
    pub fn cursor_field(mut self, field: impl Into<String>) -> Self {
        self.cursor_field = field.into();
        self
    }

    /// Equality clauses for every entry of a filter map
    pub fn from_filters(filters: Option<&Filters>) -> Self {
        let mut config = Self::new();
        for (field, value) in filters.into_iter().flatten() {
            config.filters.push(FilterClause::eq(field.clone(), value.clone()));
        }
        config
    }

    /// Build from URL query parameters.
    ///
    /// Reserved: `page`, `limit`, `cursor`, `sort` (comma separated,
    /// `-` prefix for descending), `fields` (comma separated projection).
    /// Any other `name` is an `eq` filter; `name__op` selects an operator.
    /// `in` operands are comma separated.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::new();
        let mut request = PaginationRequest::new();

        let mut names: Vec<&String> = params.keys().collect();
        names.sort();

        for name in names {
            let raw = &params[name];
            match name.as_str() {
                "page" => request.page = Some(parse_number(name, raw)?),
                "limit" => request.limit = Some(parse_number(name, raw)?),
                "cursor" => request.cursor = Some(raw.clone()),
                "sort" => {
                    config.sorts = raw
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(SortClause::parse)
                        .collect();
                }
                "fields" => {
                    config.includes = raw
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(ToString::to_string)
                        .collect();
                }
                _ => {
                    let (field, operator) = match name.rsplit_once("__") {
                        Some((field, op)) => (field, FilterOperator::parse(op)?),
                        None => (name.as_str(), FilterOperator::Eq),
                    };
                    let value = match operator {
                        FilterOperator::In => JsonValue::Array(
                            raw.split(',').map(parse_scalar).collect(),
                        ),
                        _ => parse_scalar(raw),
                    };
                    config.filters.push(FilterClause::new(field, operator, value));
                }
            }
        }

        config.pagination = Some(request);
        Ok(config)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u32> {
    raw.parse().map_err(|_| {
        Error::invalid_value(name, format!("expected a positive integer, got '{raw}'"))
    })
}

fn parse_scalar(raw: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(v) if !v.is_object() && !v.is_array() => v,
        _ => JsonValue::String(raw.to_string()),
    }
}
