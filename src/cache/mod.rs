//! Query cache module
//!
//! Keyed storage for fetched pages, shared across controllers.
//!
//! # Overview
//!
//! - `QueryKey` / `create_query_key` - deterministic addressing
//! - `QueryCache` - the store abstraction (`get`, `set`, `invalidate`)
//! - `MemoryCache` - process-local implementation

mod key;
mod memory;
mod types;

pub use key::{create_query_key, KeyPart, QueryKey};
pub use memory::MemoryCache;
pub use types::{CacheEntry, CacheOptions, KeyPredicate, QueryCache};
