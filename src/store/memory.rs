use crate::core::analysis::{Analysis, AnalysisStore, newest_first};
use crate::core::cache::Cache;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// In-memory cache implementation using a HashMap behind a tokio Mutex
pub struct MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, CacheValue<V>>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        let expired = match cache.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|expiry| expiry <= Instant::now()),
            None => {
                debug!("Cache MISS for key: {:?}", key);
                return None;
            }
        };
        if expired {
            debug!("Cache entry expired for key: {:?}", key);
            cache.remove(key);
            return None;
        }
        debug!("Cache HIT for key: {:?}", key);
        cache.get(key).map(|entry| entry.value.clone())
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        // A TTL past the clock's range never expires.
        let expires_at = ttl.and_then(|duration| Instant::now().checked_add(duration));
        let cache_value = CacheValue { value, expires_at };

        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, cache_value);
    }

    async fn remove(&self, key: &K) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }
}

/// Analyses kept for the lifetime of the process.
#[derive(Default)]
pub struct MemoryAnalysisStore {
    analyses: Mutex<HashMap<String, Analysis>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn insert(&self, analysis: &Analysis) -> Result<()> {
        let mut analyses = self.analyses.lock().await;
        analyses.insert(analysis.id.clone(), analysis.clone());
        debug!(id = %analysis.id, ticker = %analysis.ticker, "Stored analysis");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Analysis>> {
        Ok(self.analyses.lock().await.get(id).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Analysis>> {
        let analyses = self.analyses.lock().await;
        Ok(newest_first(analyses.values().cloned().collect(), limit))
    }

    async fn mark_saved(&self, id: &str) -> Result<Option<Analysis>> {
        let mut analyses = self.analyses.lock().await;
        Ok(analyses.get_mut(id).map(|analysis| {
            analysis.saved = true;
            analysis.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.analyses.lock().await.remove(id).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> Result<usize> {
        let mut analyses = self.analyses.lock().await;
        let before = analyses.len();
        analyses.retain(|_, analysis| !analysis.is_expired(now, retention));
        Ok(before - analyses.len())
    }
}
