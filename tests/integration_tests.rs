//! Integration tests
//!
//! Drives the pagination controller end to end: in-memory records, a mock
//! HTTP endpoint, and caches shared between controllers.

use datapager::cache::QueryCache;
use datapager::fetch::RateLimiterConfig;
use datapager::types::BackoffType;
use datapager::{
    create_query_key, ControllerConfig, HttpFetcherConfig, HttpPageFetcher, MemoryCache,
    MemorySource, PaginationController, PaginationResponse, QueryKey, RetryPolicy,
};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Order {
    id: u64,
    status: String,
}

fn orders(ids: std::ops::RangeInclusive<u64>) -> Vec<Value> {
    ids.map(|id| json!({"id": id, "status": if id % 2 == 0 { "open" } else { "closed" }}))
        .collect()
}

fn page_body(ids: std::ops::RangeInclusive<u64>, total: u64, limit: u32, page: u32) -> Value {
    json!({
        "data": orders(ids),
        "total": total,
        "limit": limit,
        "page": page,
    })
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy::default().backoff(
        BackoffType::Constant,
        Duration::from_millis(5),
        Duration::from_millis(5),
    )
}

fn http_fetcher(server: &MockServer) -> HttpPageFetcher {
    HttpPageFetcher::new(HttpFetcherConfig::builder(format!("{}/orders", server.uri())).build())
        .unwrap()
}

/// Poll until `check` holds or a second has passed
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ============================================================================
// In-memory source
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_walk_in_memory_records() {
    let source = MemorySource::new(orders(1..=23));
    let controller = PaginationController::builder(QueryKey::base(&["orders"]), source)
        .config(ControllerConfig::builder().limit(5).build())
        .build()
        .unwrap();

    controller.load().await;
    let mut sizes = vec![controller.data().len()];
    while controller.pagination().has_next_page {
        controller.next_page().await;
        sizes.push(controller.data().len());
    }

    assert_eq!(sizes, vec![5, 5, 5, 5, 3]);
    assert_eq!(controller.pagination().total_pages, 5);
    assert_eq!(controller.data().last().unwrap()["id"], json!(23));
}

#[tokio::test(start_paused = true)]
async fn test_record_file_with_filters() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), json!({"data": orders(1..=10)}).to_string()).unwrap();
    let source = MemorySource::from_file(file.path()).unwrap();

    let mut filters = datapager::Filters::new();
    filters.insert("status".to_string(), json!("open"));
    let controller = PaginationController::builder(QueryKey::base(&["orders"]), source)
        .config(ControllerConfig::builder().limit(2).filters(filters).build())
        .build()
        .unwrap();

    controller.load().await;
    assert_eq!(controller.total(), 5);
    assert_eq!(controller.pagination().total_pages, 3);
    controller.go_to_page(3).await;
    assert_eq!(controller.data(), vec![json!({"id": 10, "status": "open"})]);
}

// ============================================================================
// HTTP source
// ============================================================================

#[tokio::test]
async fn test_http_pages_with_prefetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1..=5, 7, 5, 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(6..=7, 7, 5, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let controller: PaginationController<Order> =
        PaginationController::builder(QueryKey::base(&["orders"]), http_fetcher(&server))
            .config(ControllerConfig::builder().limit(5).build())
            .build()
            .unwrap();

    controller.load().await;
    assert_eq!(controller.data().len(), 5);
    assert_eq!(controller.data()[0], Order { id: 1, status: "closed".to_string() });

    // Page 2 arrives through the prefetch, navigation then reads the cache
    let cache = controller.cache();
    let next = create_query_key(&QueryKey::base(&["orders"]), 2, 5, None);
    assert!(eventually(|| cache.contains(&next)).await);

    controller.next_page().await;
    let ids: Vec<u64> = controller.data().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![6, 7]);
    assert!(!controller.pagination().has_next_page);
}

#[tokio::test]
async fn test_http_client_error_fails_fast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such list"))
        .expect(1)
        .mount(&server)
        .await;

    let controller: PaginationController<Order> =
        PaginationController::builder(QueryKey::base(&["orders"]), http_fetcher(&server))
            .config(ControllerConfig::builder().retry(quick_retry()).build())
            .build()
            .unwrap();

    controller.load().await;

    assert!(controller.is_error());
    let error = controller.error().unwrap();
    assert_eq!(error.status(), Some(404));
    assert!(error.to_string().contains("no such list"));
}

#[tokio::test]
async fn test_http_server_error_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let controller: PaginationController<Order> =
        PaginationController::builder(QueryKey::base(&["orders"]), http_fetcher(&server))
            .config(ControllerConfig::builder().retry(quick_retry()).build())
            .build()
            .unwrap();

    controller.load().await;
    assert_eq!(controller.error().unwrap().status(), Some(503));
}

#[tokio::test]
async fn test_http_debounced_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("status", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 2, "status": "open"}],
            "total": 1,
            "limit": 10,
            "page": 1,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1..=10, 40, 10, 1)))
        .mount(&server)
        .await;

    let config = ControllerConfig::builder()
        .debounce(Duration::from_millis(30))
        .prefetch(false)
        .build();
    let fetcher = HttpPageFetcher::new(
        HttpFetcherConfig::builder(format!("{}/orders", server.uri()))
            .rate_limit(RateLimiterConfig::new(100, 10))
            .build(),
    )
    .unwrap();
    let controller: PaginationController<Order> =
        PaginationController::builder(QueryKey::base(&["orders"]), fetcher)
            .config(config)
            .build()
            .unwrap();
    controller.load().await;
    assert_eq!(controller.total(), 40);

    let mut filters = datapager::Filters::new();
    filters.insert("status".to_string(), json!("o"));
    controller.set_filters(Some(filters.clone())).await.unwrap();
    filters.insert("status".to_string(), json!("open"));
    controller.set_filters(Some(filters)).await.unwrap();

    let snapshots = controller.clone();
    assert!(eventually(|| {
        let total = snapshots.total();
        async move { total == 1 }
    })
    .await);
    assert_eq!(controller.data()[0].id, 2);

    // The intermediate "o" never reached the endpoint
    let requests = server.received_requests().await.unwrap();
    let statuses: Vec<String> = requests
        .iter()
        .flat_map(|r| {
            r.url
                .query_pairs()
                .filter(|(key, _)| key == "status")
                .map(|(_, value)| value.into_owned())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(statuses, vec!["open".to_string()]);
}

// ============================================================================
// Shared cache
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_invalidation_scoped_to_base_key() {
    let cache: Arc<dyn QueryCache<PaginationResponse<Value>>> =
        Arc::new(MemoryCache::<PaginationResponse<Value>>::new());

    let orders_view = PaginationController::builder(
        QueryKey::base(&["orders"]),
        MemorySource::new(orders(1..=20)),
    )
    .config(ControllerConfig::builder().limit(5).prefetch(false).build())
    .cache(Arc::clone(&cache))
    .build()
    .unwrap();
    let archive_view = PaginationController::builder(
        QueryKey::base(&["archive"]),
        MemorySource::new(orders(100..=110)),
    )
    .config(ControllerConfig::builder().limit(5).prefetch(false).build())
    .cache(Arc::clone(&cache))
    .build()
    .unwrap();

    orders_view.load().await;
    archive_view.load().await;
    assert_eq!(cache.len().await, 2);

    orders_view.set_limit(10).await.unwrap();

    let archive_key = archive_view.query_key().await;
    assert!(!cache.get(&archive_key).await.unwrap().invalidated);
    let old_orders_key = create_query_key(&QueryKey::base(&["orders"]), 1, 5, None);
    assert!(cache.get(&old_orders_key).await.unwrap().invalidated);
    assert_eq!(orders_view.data().len(), 10);
}
