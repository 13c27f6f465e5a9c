// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # datapager
//!
//! Client-side pagination over any paged data source, with a shared keyed
//! query cache, virtual pages sliced from an over-sized first payload,
//! debounced filter changes and next-page prefetch.
//!
//! ## Features
//!
//! - **Pagination Controller**: page/limit/filter state with clamped navigation
//! - **Query Cache**: keyed, shared, stale-while-revalidate, prefix invalidation
//! - **Virtual Pages**: no network round trip for pages already in hand
//! - **Debounced Filters**: bursts of filter edits commit once
//! - **Retry**: client errors fail fast, everything else retries with backoff
//! - **Sources**: async closures, in-memory JSON records, HTTP endpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datapager::{MemorySource, PaginationController, QueryKey, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let source = MemorySource::from_file("items.json")?;
//!     let controller = PaginationController::builder(QueryKey::base(&["items"]), source)
//!         .build()?;
//!
//!     controller.load().await;
//!     while controller.pagination().has_next_page {
//!         controller.next_page().await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PaginationController<T>                      │
//! │  go_to_page()  next_page()  set_filters()  set_limit()          │
//! │  subscribe() → watch::Receiver<Snapshot<T>>                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───┬───────────────┬─────────────┐
//! │ Virtual Pages│   Query Cache     │   Debounce    │   Fetch     │
//! ├──────────────┼───────────────────┼───────────────┼─────────────┤
//! │ Slice first  │ QueryKey          │ Scheduler     │ PageFetcher │
//! │ payload      │ Stale / expired   │ TimerHandle   │ Retry       │
//! │              │ Prefix invalidate │               │ Rate Limit  │
//! └──────────────┴───────────────────┴───────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Deep structural equality for JSON values and filter maps
pub mod compare;

/// Filter normalization and parsing
pub mod filters;

/// Pagination request/response contract and virtual pages
pub mod pagination;

/// Keyed query cache
pub mod cache;

/// Cancellable timers and debouncing
pub mod debounce;

/// Page sources, retry and rate limiting
pub mod fetch;

/// Server-side query application over JSON records
pub mod query;

/// Controller configuration
pub mod config;

/// The pagination controller
pub mod controller;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use cache::{create_query_key, MemoryCache, QueryCache, QueryKey};
pub use config::ControllerConfig;
pub use controller::{PaginationController, PaginationInfo, Snapshot};
pub use fetch::{fetch_fn, HttpFetcherConfig, HttpPageFetcher, MemorySource, PageFetcher, RetryPolicy};
pub use pagination::{PaginationRequest, PaginationResponse};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
