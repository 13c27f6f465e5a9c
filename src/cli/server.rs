//! HTTP server mode serving a record file as paginated pages

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::fetch::MemorySource;
use crate::query::{apply_query, QueryConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// JSON file holding the records
    pub file: PathBuf,
}

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    records: MemorySource,
}

/// Error body
#[derive(Debug, Serialize)]
struct ApiError {
    success: bool,
    error: String,
}

impl ApiError {
    fn response(status: StatusCode, msg: impl Into<String>) -> Response {
        let body = Self {
            success: false,
            error: msg.into(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router over `records`
pub fn router(records: MemorySource) -> Router {
    // Build CORS layer - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/items", get(list_items))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { records }))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, port: u16) -> Result<()> {
    let records = MemorySource::from_file(&config.file)?;
    tracing::info!(
        "Serving {} records from {}",
        records.len(),
        config.file.display()
    );
    let app = router(records);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Apply `page`, `limit`, `cursor`, `sort`, `fields` and `field=value` filters
async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let config = match QueryConfig::from_params(&params) {
        Ok(config) => config,
        Err(e) => return ApiError::response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match apply_query(state.records.records(), &config) {
        Ok(page) => Json(page).into_response(),
        Err(e @ Error::Query { .. }) => {
            ApiError::response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            ApiError::response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PaginationResponse;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn records() -> MemorySource {
        MemorySource::new(
            (1..=12)
                .map(|id| json!({"id": id, "status": if id % 3 == 0 { "done" } else { "open" }}))
                .collect(),
        )
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = router(records())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_items_page() {
        let (status, body) = get_json("/items?page=3&limit=5").await;
        assert_eq!(status, StatusCode::OK);

        let page: PaginationResponse<Value> = serde_json::from_value(body).unwrap();
        assert_eq!(page.total, Some(12));
        assert_eq!(page.page, Some(3));
        let ids: Vec<_> = page.data.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(11), json!(12)]);
    }

    #[tokio::test]
    async fn test_items_filtered_and_sorted() {
        let (_, body) = get_json("/items?status=done&sort=-id&limit=2").await;
        let page: PaginationResponse<Value> = serde_json::from_value(body).unwrap();
        assert_eq!(page.total, Some(4));
        let ids: Vec<_> = page.data.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(12), json!(9)]);
    }

    #[tokio::test]
    async fn test_items_bad_params() {
        let (status, body) = get_json("/items?limit=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }
}
