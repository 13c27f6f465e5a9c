//! HTTP page source
//!
//! Sends `GET {url}?page=&limit=&<filter>=<value>` and decodes the body as a
//! `PaginationResponse`. Non-2xx statuses become `Error::FetchStatus`, so a
//! 4xx answer is never retried by the controller.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::types::PageFetcher;
use crate::error::{Error, Result};
use crate::pagination::PaginationResponse;
use crate::types::{Filters, JsonValue};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP page source
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Endpoint returning pages
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Query parameter carrying the page number
    pub page_param: String,
    /// Query parameter carrying the page size
    pub limit_param: String,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers sent with every request
    pub headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl HttpFetcherConfig {
    /// Create a new config builder for `url`
    pub fn builder(url: impl Into<String>) -> HttpFetcherConfigBuilder {
        HttpFetcherConfigBuilder {
            config: Self {
                url: url.into(),
                timeout: Duration::from_secs(30),
                page_param: "page".to_string(),
                limit_param: "limit".to_string(),
                rate_limit: None,
                headers: HashMap::new(),
                user_agent: format!("datapager/{}", env!("CARGO_PKG_VERSION")),
            },
        }
    }
}

/// Builder for [`HttpFetcherConfig`]
#[derive(Debug)]
pub struct HttpFetcherConfigBuilder {
    config: HttpFetcherConfig,
}

impl HttpFetcherConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Rename the page and limit query parameters
    pub fn params(mut self, page: impl Into<String>, limit: impl Into<String>) -> Self {
        self.config.page_param = page.into();
        self.config.limit_param = limit.into();
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpFetcherConfig {
        self.config
    }
}

/// Fetches pages from an HTTP endpoint
pub struct HttpPageFetcher {
    client: Client,
    url: Url,
    config: HttpFetcherConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpPageFetcher {
    /// Create a fetcher; fails on a malformed URL
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let url = Url::parse(&config.url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            url,
            config,
            rate_limiter,
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    fn query_pairs(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&Filters>,
    ) -> Vec<(String, String)> {
        let mut pairs = vec![
            (self.config.page_param.clone(), page.to_string()),
            (self.config.limit_param.clone(), limit.to_string()),
        ];
        for (key, value) in filters.into_iter().flatten() {
            match value {
                JsonValue::Null => {}
                JsonValue::String(s) => pairs.push((key.clone(), s.clone())),
                other => pairs.push((key.clone(), other.to_string())),
            }
        }
        pairs
    }
}

#[async_trait]
impl<T> PageFetcher<T> for HttpPageFetcher
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&Filters>,
    ) -> Result<PaginationResponse<T>> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self
            .client
            .get(self.url.clone())
            .query(&self.query_pairs(page, limit, filters));
        for (key, value) in &self.config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::fetch_status(status.as_u16(), body));
        }

        debug!("Fetched page {} (limit {}) from {}", page, limit, self.url);
        let page: PaginationResponse<T> = response.json().await?;
        Ok(page)
    }
}

impl std::fmt::Debug for HttpPageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("url", &self.url.as_str())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}
