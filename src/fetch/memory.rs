//! In-memory record source

use super::types::PageFetcher;
use crate::error::{Error, Result};
use crate::pagination::{PaginationRequest, PaginationResponse};
use crate::query::{apply_query, QueryConfig};
use crate::types::{Filters, JsonValue};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Serves pages from a fixed set of JSON records
///
/// Filters become equality clauses; paging is offset based.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Arc<Vec<JsonValue>>,
    latency: Option<Duration>,
}

impl MemorySource {
    /// Create a source over `records`
    pub fn new(records: Vec<JsonValue>) -> Self {
        Self {
            records: Arc::new(records),
            latency: None,
        }
    }

    /// Load records from a JSON file.
    ///
    /// Accepts a top-level array or an object with a `data` array.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&content)
    }

    /// Parse records from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<JsonValue>(json)? {
            JsonValue::Array(records) => Ok(Self::new(records)),
            JsonValue::Object(mut map) => match map.remove("data") {
                Some(JsonValue::Array(records)) => Ok(Self::new(records)),
                _ => Err(Error::config("expected a 'data' array of records")),
            },
            _ => Err(Error::config("expected an array of records")),
        }
    }

    /// Sleep for `latency` before answering each fetch
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Records held
    pub fn records(&self) -> &[JsonValue] {
        &self.records
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the source holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PageFetcher<JsonValue> for MemorySource {
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&Filters>,
    ) -> Result<PaginationResponse<JsonValue>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let config = QueryConfig::from_filters(filters)
            .paginate(PaginationRequest::new().with_page(page).with_limit(limit));
        apply_query(&self.records, &config)
    }
}
