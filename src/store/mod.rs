pub mod disk;
pub mod memory;

use anyhow::{Context, Result};
use disk::{DiskAnalysisStore, DiskCache};
use fjall::{Keyspace, PartitionCreateOptions};
use std::path::Path;
use tracing::debug;

/// A fjall keyspace holding the cache and analysis collections.
pub struct KeyValueStore {
    keyspace: Keyspace,
}

impl KeyValueStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("db"))
            .open()
            .with_context(|| format!("Failed to open data store at {}", path.display()))?;
        debug!("Opened data store at {}", path.display());
        Ok(Self { keyspace })
    }

    pub fn cache<K, V>(&self, name: &str) -> Result<DiskCache<K, V>> {
        let partition = self
            .keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open collection: {name}"))?;
        Ok(DiskCache::new(self.keyspace.clone(), partition))
    }

    pub fn analyses(&self, name: &str) -> Result<DiskAnalysisStore> {
        let partition = self
            .keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open collection: {name}"))?;
        Ok(DiskAnalysisStore::new(self.keyspace.clone(), partition))
    }
}
