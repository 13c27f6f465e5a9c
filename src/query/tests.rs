//! Tests for the query module

use super::*;
use crate::pagination::PaginationRequest;
use serde_json::{json, Value};
use std::collections::HashMap;
use test_case::test_case;

fn orders() -> Vec<Value> {
    vec![
        json!({"id": 1, "status": "open", "title": "Logo redesign", "amount": 120, "created_at": "2024-01-01", "client": {"name": "Acme"}}),
        json!({"id": 2, "status": "closed", "title": "Landing page", "amount": 80, "created_at": "2024-01-02", "client": {"name": "Globex"}}),
        json!({"id": 3, "status": "open", "title": "Brand guide", "amount": 300, "created_at": "2024-01-03", "client": {"name": "Acme"}}),
        json!({"id": 4, "status": "open", "title": "Logo animation", "amount": 45, "created_at": "2024-01-04", "client": {"name": "Initech"}}),
        json!({"id": 5, "status": "draft", "title": "Newsletter", "amount": null, "created_at": "2024-01-05", "client": {"name": "Globex"}}),
    ]
}

fn ids(response: &crate::pagination::PaginationResponse<Value>) -> Vec<i64> {
    response
        .data
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

#[test]
fn test_no_pagination_returns_everything() {
    let response = apply_query(&orders(), &QueryConfig::new()).unwrap();
    assert_eq!(response.len(), 5);
    assert_eq!(response.total, Some(5));
    assert_eq!(response.page, Some(1));
}

#[test_case(FilterClause::eq("status", "open") => vec![1, 3, 4] ; "eq")]
#[test_case(FilterClause::eq("id", "2") => vec![2] ; "eq string against number")]
#[test_case(FilterClause::new("title", FilterOperator::Like, "LOGO") => vec![1, 4] ; "like is case insensitive")]
#[test_case(FilterClause::new("amount", FilterOperator::Gt, 100) => vec![1, 3] ; "gt")]
#[test_case(FilterClause::new("amount", FilterOperator::Lt, 80) => vec![4] ; "lt")]
#[test_case(FilterClause::new("amount", FilterOperator::Gte, 80) => vec![1, 2, 3] ; "gte")]
#[test_case(FilterClause::new("amount", FilterOperator::Lte, 80) => vec![2, 4] ; "lte")]
#[test_case(FilterClause::new("status", FilterOperator::In, json!(["draft", "closed"])) => vec![2, 5] ; "in")]
#[test_case(FilterClause::new("amount", FilterOperator::Is, Value::Null) => vec![5] ; "is null")]
#[test_case(FilterClause::eq("client.name", "Acme") => vec![1, 3] ; "nested field")]
fn test_filter_operators(clause: FilterClause) -> Vec<i64> {
    let response = apply_query(&orders(), &QueryConfig::new().filter(clause)).unwrap();
    ids(&response)
}

#[test]
fn test_filters_combine_with_and() {
    let config = QueryConfig::new()
        .filter(FilterClause::eq("status", "open"))
        .filter(FilterClause::new("amount", FilterOperator::Gt, 100));
    assert_eq!(ids(&apply_query(&orders(), &config).unwrap()), vec![1, 3]);
}

#[test]
fn test_sorts() {
    let config = QueryConfig::new().sort(SortClause::desc("amount"));
    // Null amounts sort last
    assert_eq!(
        ids(&apply_query(&orders(), &config).unwrap()),
        vec![3, 1, 2, 4, 5]
    );

    let config = QueryConfig::new()
        .sort(SortClause::asc("status"))
        .sort(SortClause::desc("id"));
    assert_eq!(
        ids(&apply_query(&orders(), &config).unwrap()),
        vec![2, 5, 4, 3, 1]
    );
}

#[test]
fn test_offset_pagination() {
    let config = QueryConfig::new().paginate(PaginationRequest::new().with_page(2).with_limit(2));
    let response = apply_query(&orders(), &config).unwrap();
    assert_eq!(ids(&response), vec![3, 4]);
    assert_eq!(response.total, Some(5));
    assert_eq!(response.page, Some(2));
    assert_eq!(response.limit, 2);

    let config = QueryConfig::new().paginate(PaginationRequest::new().with_page(9).with_limit(2));
    let response = apply_query(&orders(), &config).unwrap();
    assert!(response.is_empty());
    assert_eq!(response.total, Some(5));
}

#[test]
fn test_total_counts_filtered_rows() {
    let config = QueryConfig::new()
        .filter(FilterClause::eq("status", "open"))
        .paginate(PaginationRequest::new().with_limit(2));
    let response = apply_query(&orders(), &config).unwrap();
    assert_eq!(ids(&response), vec![1, 3]);
    assert_eq!(response.total, Some(3));
    assert_eq!(response.total_pages(), 2);
}

#[test]
fn test_cursor_pagination() {
    let config = QueryConfig::new().paginate(
        PaginationRequest::new()
            .with_limit(2)
            .with_cursor("2024-01-01"),
    );
    let response = apply_query(&orders(), &config).unwrap();
    assert_eq!(ids(&response), vec![2, 3]);
    assert_eq!(response.next_cursor.as_deref(), Some("2024-01-03"));
    assert_eq!(response.prev_cursor.as_deref(), Some("2024-01-01"));
    assert!(response.page.is_none());
    assert!(response.validate().is_ok());

    let config = QueryConfig::new().paginate(
        PaginationRequest::new()
            .with_limit(2)
            .with_cursor("2024-01-03"),
    );
    let response = apply_query(&orders(), &config).unwrap();
    assert_eq!(ids(&response), vec![4, 5]);
    assert!(response.next_cursor.is_none());
}

#[test]
fn test_cursor_on_custom_field() {
    let config = QueryConfig::new()
        .cursor_field("id")
        .paginate(PaginationRequest::new().with_limit(10).with_cursor("3"));
    assert_eq!(ids(&apply_query(&orders(), &config).unwrap()), vec![4, 5]);
}

#[test]
fn test_projection() {
    let config = QueryConfig::new()
        .include(["id", "status"])
        .paginate(PaginationRequest::new().with_limit(1));
    let response = apply_query(&orders(), &config).unwrap();
    assert_eq!(response.data[0], json!({"id": 1, "status": "open"}));
}

#[test]
fn test_from_filters() {
    let filters = json!({"status": "open", "client.name": "Acme"})
        .as_object()
        .cloned()
        .unwrap();
    let config = QueryConfig::from_filters(Some(&filters));
    assert_eq!(config.filters.len(), 2);
    assert_eq!(ids(&apply_query(&orders(), &config).unwrap()), vec![1, 3]);

    assert!(QueryConfig::from_filters(None).filters.is_empty());
}

#[test]
fn test_from_params() {
    let params: HashMap<String, String> = [
        ("page", "1"),
        ("limit", "2"),
        ("sort", "-amount"),
        ("status__in", "open,closed"),
        ("amount__gte", "80"),
        ("fields", "id,title"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let config = QueryConfig::from_params(&params).unwrap();
    assert_eq!(config.sorts, vec![SortClause::desc("amount")]);
    assert_eq!(config.includes, vec!["id".to_string(), "title".to_string()]);

    let response = apply_query(&orders(), &config).unwrap();
    assert_eq!(ids(&response), vec![3, 1]);
    assert_eq!(response.total, Some(3));
    assert_eq!(response.data[0].as_object().unwrap().len(), 2);
}

#[test]
fn test_from_params_rejects_bad_input() {
    let mut params = HashMap::new();
    params.insert("limit".to_string(), "ten".to_string());
    assert!(QueryConfig::from_params(&params).is_err());

    let mut params = HashMap::new();
    params.insert("amount__between".to_string(), "1".to_string());
    assert!(QueryConfig::from_params(&params).is_err());
}

#[test]
fn test_query_config_deserialize() {
    let config: QueryConfig = serde_json::from_value(json!({
        "filters": [{"field": "status", "operator": "like", "value": "OP"}],
        "sorts": [{"field": "id", "direction": "desc"}],
        "pagination": {"page": 1, "limit": 2}
    }))
    .unwrap();
    assert_eq!(config.cursor_field, "created_at");
    assert_eq!(ids(&apply_query(&orders(), &config).unwrap()), vec![4, 3]);
}
