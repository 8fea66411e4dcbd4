use crate::core::analysis::{Analysis, AnalysisStore, newest_first};
use crate::core::cache::Cache;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<SystemTime>,
}

/// Cache backed by a fjall partition; keys and entries are stored as JSON.
pub struct DiskCache<K, V> {
    keyspace: Keyspace,
    partition: PartitionHandle,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> DiskCache<K, V> {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
            _marker: PhantomData,
        }
    }

    fn read<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        Q: Serialize + Debug,
        V: DeserializeOwned,
    {
        let raw_key = serde_json::to_vec(key)?;
        let Some(value) = self.partition.get(&raw_key)? else {
            debug!("Cache MISS for key: {:?}", key);
            return Ok(None);
        };

        let entry: CacheEntry<V> = serde_json::from_slice(&value)?;
        if let Some(expires_at) = entry.expires_at {
            if SystemTime::now() >= expires_at {
                debug!("Cache entry expired for key: {:?}", key);
                self.partition.remove(raw_key)?;
                return Ok(None);
            }
        }
        debug!("Cache HIT for key: {:?}", key);
        Ok(Some(entry.value))
    }

    fn write(&self, key: &K, value: V, ttl: Option<Duration>) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let expires_at = ttl.and_then(|d| SystemTime::now().checked_add(d));
        let entry = CacheEntry { value, expires_at };
        self.partition
            .insert(serde_json::to_vec(key)?, serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for DiskCache<K, V>
where
    K: Eq + Hash + Send + Sync + Serialize + DeserializeOwned + Debug + 'static,
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        match self.read(key) {
            Ok(val) => val,
            Err(e) => {
                debug!("DiskCache get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        match self.write(&key, value, ttl) {
            Ok(()) => debug!("Cache PUT for key: {:?}", key),
            Err(e) => debug!("DiskCache put error: {}", e),
        }
    }

    async fn remove(&self, key: &K) {
        let res: Result<()> = (|| Ok(self.partition.remove(serde_json::to_vec(key)?)?))();
        if let Err(e) = res {
            debug!("DiskCache remove error: {}", e);
        }
    }

    async fn clear(&self) {
        let res: Result<()> = (|| {
            for key in self.partition.keys() {
                self.partition.remove(key?)?;
            }
            Ok(())
        })();
        if let Err(e) = res {
            debug!("DiskCache clear error: {}", e)
        }
    }
}

/// Analyses stored as JSON documents keyed by id.
///
/// Mutations hold `writes` so a read-modify-write never resurrects a record
/// deleted in between.
pub struct DiskAnalysisStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    writes: Mutex<()>,
}

impl DiskAnalysisStore {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
            writes: Mutex::new(()),
        }
    }

    fn load(&self, id: &str) -> Result<Option<Analysis>> {
        match self.partition.get(id)? {
            Some(value) => Ok(Some(
                serde_json::from_slice(&value).context("Failed to decode stored analysis")?,
            )),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<Vec<Analysis>> {
        self.partition
            .values()
            .map(|value| {
                let value = value?;
                serde_json::from_slice(&value).context("Failed to decode stored analysis")
            })
            .collect()
    }

    fn write(&self, analysis: &Analysis) -> Result<()> {
        self.partition
            .insert(analysis.id.as_bytes(), serde_json::to_vec(analysis)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for DiskAnalysisStore {
    async fn insert(&self, analysis: &Analysis) -> Result<()> {
        let _guard = self.writes.lock().await;
        self.write(analysis)
            .with_context(|| format!("Failed to store analysis {}", analysis.id))?;
        debug!(id = %analysis.id, ticker = %analysis.ticker, "Stored analysis");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Analysis>> {
        self.load(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Analysis>> {
        Ok(newest_first(self.load_all()?, limit))
    }

    async fn mark_saved(&self, id: &str) -> Result<Option<Analysis>> {
        let _guard = self.writes.lock().await;
        let Some(mut analysis) = self.load(id)? else {
            return Ok(None);
        };
        analysis.saved = true;
        self.write(&analysis)?;
        Ok(Some(analysis))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.writes.lock().await;
        if !self.partition.contains_key(id)? {
            return Ok(false);
        }
        self.partition.remove(id)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> Result<usize> {
        let _guard = self.writes.lock().await;
        let mut purged = 0;
        for analysis in self.load_all()? {
            if analysis.is_expired(now, retention) {
                self.partition.remove(analysis.id.as_bytes())?;
                purged += 1;
            }
        }
        if purged > 0 {
            self.keyspace.persist(PersistMode::Buffer)?;
        }
        Ok(purged)
    }
}
