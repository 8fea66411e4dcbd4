//! Key/value cache abstraction with optional per-entry expiry.
use async_trait::async_trait;
use std::time::Duration;

/// A cache whose entries may carry a time to live.
///
/// Expired entries read as absent. Backend failures are logged and treated
/// as a miss so callers can fall back to the source of truth.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
    async fn remove(&self, key: &K);
    async fn clear(&self);
}
