//! Partition storage backends.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offline_core::CapturedResponse;
use serde::{Deserialize, Serialize};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Storage quota exhausted.
    #[error("quota exceeded writing to {0}")]
    QuotaExceeded(String),
}

/// Status of a cache-aware response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from cache without touching the network.
    Hit,
    /// Served from the network (and written when cacheable).
    Miss,
    /// Served from cache after the network failed.
    Stale,
    /// Produced by the runtime because nothing else could answer.
    Offline,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Stale => write!(f, "STALE"),
            Self::Offline => write!(f, "OFFLINE"),
        }
    }
}

/// A response stored in a partition.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// The stored response.
    pub response: CapturedResponse,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// Monotonic write sequence; higher is fresher.
    pub sequence: u64,
    /// Whether this entry is a verified-good copy of the data endpoint.
    pub last_known_good: bool,
}

impl CachedEntry {
    /// Wrap a response for storage.
    pub fn new(response: CapturedResponse) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
            sequence: 0,
            last_known_good: false,
        }
    }

    /// Mark the entry as a last-known-good copy.
    pub fn with_last_known_good(mut self) -> Self {
        self.last_known_good = true;
        self
    }

    /// Set the write sequence.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Age in whole seconds.
    pub fn age_secs(&self) -> u64 {
        (Utc::now() - self.stored_at).num_seconds().max(0) as u64
    }
}

/// Storage backend holding named partitions of key/response entries.
///
/// Implementations must make each `put` atomic per entry: a concurrent
/// reader sees either the previous entry or the new one, never a mix.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Create a partition if it does not exist.
    async fn open(&self, partition: &str) -> CacheResult<()>;

    /// Whether a partition exists.
    async fn has(&self, partition: &str) -> CacheResult<bool>;

    /// Store an entry, creating the partition if needed.
    async fn put(&self, partition: &str, key: &str, entry: CachedEntry) -> CacheResult<()>;

    /// Get an entry.
    async fn get(&self, partition: &str, key: &str) -> CacheResult<Option<CachedEntry>>;

    /// Keys stored in a partition (empty if the partition does not exist).
    async fn keys(&self, partition: &str) -> CacheResult<Vec<String>>;

    /// Delete a partition with all its entries. Returns whether it existed.
    async fn delete(&self, partition: &str) -> CacheResult<bool>;

    /// Names of all existing partitions.
    async fn partitions(&self) -> CacheResult<Vec<String>>;
}

/// In-memory partition store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<String, HashMap<String, CachedEntry>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::Storage("partition lock poisoned".to_string())
}

#[async_trait]
impl PartitionStore for MemoryStore {
    async fn open(&self, partition: &str) -> CacheResult<()> {
        let mut partitions = self.partitions.write().map_err(poisoned)?;
        partitions.entry(partition.to_string()).or_default();
        Ok(())
    }

    async fn has(&self, partition: &str) -> CacheResult<bool> {
        let partitions = self.partitions.read().map_err(poisoned)?;
        Ok(partitions.contains_key(partition))
    }

    async fn put(&self, partition: &str, key: &str, entry: CachedEntry) -> CacheResult<()> {
        let mut partitions = self.partitions.write().map_err(poisoned)?;
        partitions
            .entry(partition.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, partition: &str, key: &str) -> CacheResult<Option<CachedEntry>> {
        let partitions = self.partitions.read().map_err(poisoned)?;
        Ok(partitions.get(partition).and_then(|p| p.get(key)).cloned())
    }

    async fn keys(&self, partition: &str) -> CacheResult<Vec<String>> {
        let partitions = self.partitions.read().map_err(poisoned)?;
        let mut keys: Vec<String> = partitions
            .get(partition)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, partition: &str) -> CacheResult<bool> {
        let mut partitions = self.partitions.write().map_err(poisoned)?;
        Ok(partitions.remove(partition).is_some())
    }

    async fn partitions(&self) -> CacheResult<Vec<String>> {
        let partitions = self.partitions.read().map_err(poisoned)?;
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
