//! Cache types and traits
//!
//! The cache is an injected, shared key-value store. Controllers read and
//! write through `QueryCache` and never own it.

use super::key::QueryKey;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Freshness and retention for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long data counts as fresh
    pub stale_time: Duration,
    /// How long an unused entry is retained
    pub cache_time: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            cache_time: Duration::from_secs(600),
        }
    }
}

impl CacheOptions {
    /// Create cache options
    pub fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }
}

/// A cached value with its bookkeeping
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// Cached value
    pub value: Arc<V>,
    /// When the value was written
    pub updated_at: Instant,
    /// When the entry was last read or written
    pub last_accessed: Instant,
    /// Set by `invalidate`, cleared by the next write
    pub invalidated: bool,
    /// Freshness and retention
    pub options: CacheOptions,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            updated_at: self.updated_at,
            last_accessed: self.last_accessed,
            invalidated: self.invalidated,
            options: self.options,
        }
    }
}

impl<V> CacheEntry<V> {
    /// Create a fresh entry
    pub fn new(value: Arc<V>, options: CacheOptions) -> Self {
        let now = Instant::now();
        Self {
            value,
            updated_at: now,
            last_accessed: now,
            invalidated: false,
            options,
        }
    }

    /// Invalidated, or older than its stale time
    pub fn is_stale(&self) -> bool {
        self.invalidated || self.updated_at.elapsed() >= self.options.stale_time
    }

    /// Unused for longer than its cache time
    pub fn is_expired(&self) -> bool {
        self.last_accessed.elapsed() >= self.options.cache_time
    }
}

/// Predicate used for bulk invalidation
pub type KeyPredicate<'a> = &'a (dyn Fn(&QueryKey) -> bool + Send + Sync);

/// Shared keyed store for query results
///
/// Writes are keyed last-writer-wins; no operation touches more than the
/// keys it names or matches.
#[async_trait]
pub trait QueryCache<V>: Send + Sync {
    /// Read an entry; expired entries are dropped and not returned
    async fn get(&self, key: &QueryKey) -> Option<CacheEntry<V>>;

    /// Write an entry, replacing any previous value
    async fn set(&self, key: QueryKey, value: Arc<V>, options: CacheOptions);

    /// Mark every matching entry stale, returning how many matched
    async fn invalidate(&self, predicate: KeyPredicate<'_>) -> usize;

    /// Remove one entry
    async fn remove(&self, key: &QueryKey) -> bool;

    /// Drop expired entries, returning how many were dropped
    async fn gc(&self) -> usize;

    /// Number of entries currently held
    async fn len(&self) -> usize;

    /// Check if the cache holds no entries
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Check if a key holds an entry
    async fn contains(&self, key: &QueryKey) -> bool {
        self.get(key).await.is_some()
    }

    /// Invalidate every key under `prefix`
    async fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        self.invalidate(&|key: &QueryKey| key.starts_with(prefix))
            .await
    }
}
