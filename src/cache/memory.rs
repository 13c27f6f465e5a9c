//! In-memory query cache
//!
//! Entries live in a `HashMap` behind a shared `RwLock`; clones share the
//! same store.

use super::key::QueryKey;
use super::types::{CacheEntry, CacheOptions, KeyPredicate, QueryCache};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

const MIN_GC_PERIOD: Duration = Duration::from_millis(1);

/// Process-local `QueryCache`
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: Arc<RwLock<HashMap<QueryKey, CacheEntry<V>>>>,
}

impl<V> MemoryCache<V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<V: Send + Sync + 'static> MemoryCache<V> {
    /// Run `gc` every `period` on a background task; a zero period is raised to 1ms
    pub fn spawn_gc(&self, period: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        let period = period.max(MIN_GC_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let dropped = cache.gc().await;
                if dropped > 0 {
                    debug!("Cache GC dropped {} entries", dropped);
                }
            }
        })
    }

    /// All keys currently held
    pub async fn keys(&self) -> Vec<QueryKey> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for MemoryCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[async_trait]
impl<V: Send + Sync> QueryCache<V> for MemoryCache<V> {
    async fn get(&self, key: &QueryKey) -> Option<CacheEntry<V>> {
        let mut entries = self.entries.write().await;
        let expired = entries.get(key)?.is_expired();
        if expired {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.last_accessed = Instant::now();
        Some(entry.clone())
    }

    async fn set(&self, key: QueryKey, value: Arc<V>, options: CacheOptions) {
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry::new(value, options));
    }

    async fn invalidate(&self, predicate: KeyPredicate<'_>) -> usize {
        let mut entries = self.entries.write().await;
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if predicate(key) {
                entry.invalidated = true;
                count += 1;
            }
        }
        count
    }

    async fn remove(&self, key: &QueryKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn gc(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
