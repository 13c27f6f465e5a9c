//! Query application over in-memory records
//!
//! Applies projection, filters, sorts and pagination, in that order of
//! concern, to a slice of JSON records.

use super::types::{FilterClause, FilterOperator, QueryConfig, SortClause};
use crate::error::Result;
use crate::pagination::{PageWindow, PaginationResponse};
use crate::types::JsonValue;
use std::cmp::Ordering;

/// Run `config` against `records`
pub fn apply_query(
    records: &[JsonValue],
    config: &QueryConfig,
) -> Result<PaginationResponse<JsonValue>> {
    let mut matched: Vec<&JsonValue> = records
        .iter()
        .filter(|record| {
            config
                .filters
                .iter()
                .all(|clause| matches_clause(record, clause))
        })
        .collect();

    if !config.sorts.is_empty() {
        matched.sort_by(|a, b| compare_by_sorts(a, b, &config.sorts));
    }

    let total = matched.len() as u64;

    let Some(request) = &config.pagination else {
        let limit = matched.len().max(1) as u32;
        let data = matched.into_iter().map(|r| project(r, &config.includes)).collect();
        return Ok(PaginationResponse::new(data, Some(total), limit, 1));
    };

    match request.window() {
        PageWindow::Offset { offset, limit } => {
            let page = request.page_or_default();
            let data = matched
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(limit as usize)
                .map(|r| project(r, &config.includes))
                .collect();
            Ok(PaginationResponse::new(data, Some(total), limit, page))
        }
        PageWindow::Cursor { cursor, limit } => {
            let cursor_value = JsonValue::String(cursor.clone());
            let remaining: Vec<&JsonValue> = matched
                .into_iter()
                .filter(|record| {
                    lookup(record, &config.cursor_field)
                        .and_then(|v| compare_values(v, &cursor_value))
                        == Some(Ordering::Greater)
                })
                .collect();

            let has_more = remaining.len() > limit as usize;
            let page: Vec<&JsonValue> = remaining.into_iter().take(limit as usize).collect();
            let next_cursor = if has_more {
                page.last()
                    .and_then(|r| lookup(r, &config.cursor_field))
                    .map(scalar_string)
            } else {
                None
            };
            let data = page.into_iter().map(|r| project(r, &config.includes)).collect();
            Ok(PaginationResponse::with_cursors(
                data,
                Some(total),
                limit,
                next_cursor,
                Some(cursor),
            ))
        }
    }
}

/// Resolve a dotted field path
pub fn lookup<'a>(record: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(record, |current, part| match current {
        JsonValue::Object(map) => map.get(part),
        _ => None,
    })
}

fn matches_clause(record: &JsonValue, clause: &FilterClause) -> bool {
    let field = lookup(record, &clause.field);
    match clause.operator {
        FilterOperator::Eq => field.is_some_and(|v| loose_eq(v, &clause.value)),
        FilterOperator::Like => field.is_some_and(|v| {
            scalar_string(v)
                .to_lowercase()
                .contains(&scalar_string(&clause.value).to_lowercase())
        }),
        FilterOperator::Gt => ordering(field, &clause.value) == Some(Ordering::Greater),
        FilterOperator::Lt => ordering(field, &clause.value) == Some(Ordering::Less),
        FilterOperator::Gte => matches!(
            ordering(field, &clause.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::Lte => matches!(
            ordering(field, &clause.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::In => match (&clause.value, field) {
            (JsonValue::Array(options), Some(v)) => options.iter().any(|o| loose_eq(v, o)),
            _ => false,
        },
        FilterOperator::Is => match &clause.value {
            JsonValue::Null => field.map_or(true, JsonValue::is_null),
            other => field.is_some_and(|v| v == other),
        },
    }
}

fn ordering(field: Option<&JsonValue>, operand: &JsonValue) -> Option<Ordering> {
    compare_values(field?, operand)
}

/// Order two scalars: numbers numerically, everything else by string form.
///
/// Null and compound values do not compare.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::Number(x), JsonValue::String(s)) => {
            x.as_f64()?.partial_cmp(&s.parse::<f64>().ok()?)
        }
        (JsonValue::String(s), JsonValue::Number(y)) => {
            s.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?)
        }
        (JsonValue::Null, _) | (_, JsonValue::Null) => None,
        (JsonValue::Array(_) | JsonValue::Object(_), _)
        | (_, JsonValue::Array(_) | JsonValue::Object(_)) => None,
        _ => Some(scalar_string(a).cmp(&scalar_string(b))),
    }
}

fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Null, _) | (_, JsonValue::Null) => false,
        (JsonValue::Number(_), _) | (_, JsonValue::Number(_)) => {
            compare_values(a, b) == Some(Ordering::Equal)
        }
        (JsonValue::String(_) | JsonValue::Bool(_), JsonValue::String(_) | JsonValue::Bool(_)) => {
            scalar_string(a) == scalar_string(b)
        }
        _ => a == b,
    }
}

fn scalar_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_by_sorts(a: &JsonValue, b: &JsonValue, sorts: &[SortClause]) -> Ordering {
    for sort in sorts {
        let ordering = match (present(a, &sort.field), present(b, &sort.field)) {
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            // Missing and null values sort last in either direction
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = if sort.direction.is_ascending() {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn present<'a>(record: &'a JsonValue, field: &str) -> Option<&'a JsonValue> {
    lookup(record, field).filter(|v| !v.is_null())
}

fn project(record: &JsonValue, includes: &[String]) -> JsonValue {
    if includes.is_empty() {
        return record.clone();
    }
    match record {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .filter(|(key, _)| includes.iter().any(|f| f == *key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
