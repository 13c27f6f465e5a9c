//! Page sources and retry handling
//!
//! # Overview
//!
//! - `PageFetcher` - the trait every page source implements
//! - `FnFetcher` / `fetch_fn` - async closure adapter
//! - `RetryPolicy` / `fetch_with_retry` - client errors fail fast, others retry with backoff
//! - `MemorySource` - JSON records paged through the query engine
//! - `HttpPageFetcher` - remote endpoint returning `PaginationResponse` bodies

mod http;
mod memory;
mod rate_limit;
mod retry;
mod types;

pub use http::{HttpFetcherConfig, HttpFetcherConfigBuilder, HttpPageFetcher};
pub use memory::MemorySource;
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{fetch_with_retry, RetryPolicy};
pub use types::{fetch_fn, FnFetcher, PageFetcher};
