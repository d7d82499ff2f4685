//! Cache Store Manager.
//!
//! Owns every partition operation. Strategy code never touches a
//! `PartitionStore` directly; it goes through this manager, which turns
//! storage failures into logged misses and serializes partition-wide
//! mutations (eviction, invalidation, install) against entry reads and
//! writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use offline_core::CapturedResponse;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::key::CacheKey;
use crate::partition::{LogicalPartition, PartitionName};
use crate::store::{CacheResult, CachedEntry, PartitionStore};

/// Handle to a current-generation partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionHandle {
    name: PartitionName,
}

impl PartitionHandle {
    /// Logical partition.
    pub fn logical(&self) -> LogicalPartition {
        self.name.logical
    }

    /// Full partition name.
    pub fn name(&self) -> &PartitionName {
        &self.name
    }
}

impl std::fmt::Display for PartitionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Outcome of a cache read. Storage failures surface as `Miss`.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Entry found.
    Hit {
        /// Partition the entry came from.
        partition: PartitionName,
        /// The stored entry.
        entry: CachedEntry,
    },
    /// No usable entry.
    Miss,
}

impl CacheLookup {
    /// Whether this lookup found an entry.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Entry count of one partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    /// Partition name.
    pub name: String,
    /// Number of stored entries.
    pub entries: usize,
}

/// Manages the named, generation-tagged partitions of one runtime.
pub struct CacheStoreManager {
    store: Arc<dyn PartitionStore>,
    generation: String,
    /// Readers: entry reads/writes. Writers: partition-wide mutations.
    gate: RwLock<()>,
    sequence: AtomicU64,
}

impl CacheStoreManager {
    /// Create a manager for the given build generation.
    pub fn new(store: Arc<dyn PartitionStore>, generation: impl Into<String>) -> Self {
        Self {
            store,
            generation: generation.into(),
            gate: RwLock::new(()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Current build generation tag.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Handle for the current-generation partition, without touching storage.
    pub fn handle(&self, logical: LogicalPartition) -> PartitionHandle {
        PartitionHandle {
            name: PartitionName::new(logical, self.generation.clone()),
        }
    }

    /// Create (if needed) and return the current-generation partition.
    ///
    /// Idempotent. A storage failure is logged; the handle is still usable
    /// and later writes create the partition lazily.
    pub async fn open(&self, logical: LogicalPartition) -> PartitionHandle {
        let handle = self.handle(logical);
        let _guard = self.gate.read().await;
        if let Err(e) = self.store.open(&handle.name.as_string()).await {
            tracing::warn!(partition = %handle, error = %e, "failed to open partition");
        }
        handle
    }

    /// Write an independent copy of `response`. Returns whether the write
    /// landed; failures are logged and never propagated.
    pub async fn put(&self, handle: &PartitionHandle, key: &CacheKey, response: &CapturedResponse) -> bool {
        self.write(handle, key, CachedEntry::new(response.cache_copy())).await
    }

    /// Write a verified-good copy of a data response.
    pub async fn put_last_known_good(
        &self,
        handle: &PartitionHandle,
        key: &CacheKey,
        response: &CapturedResponse,
    ) -> bool {
        let entry = CachedEntry::new(response.cache_copy()).with_last_known_good();
        self.write(handle, key, entry).await
    }

    async fn write(&self, handle: &PartitionHandle, key: &CacheKey, entry: CachedEntry) -> bool {
        let entry = entry.with_sequence(self.next_sequence());
        let _guard = self.gate.read().await;
        match self.store.put(&handle.name.as_string(), key.as_str(), entry).await {
            Ok(()) => {
                tracing::debug!(partition = %handle, key = %key, "cache write");
                true
            }
            Err(e) => {
                tracing::warn!(partition = %handle, key = %key, error = %e, "cache write failed");
                false
            }
        }
    }

    /// Read from one partition.
    pub async fn match_in(&self, handle: &PartitionHandle, key: &CacheKey) -> CacheLookup {
        let _guard = self.gate.read().await;
        self.read(&handle.name, key).await
    }

    /// Read from every current-generation partition; the freshest write wins.
    pub async fn match_any(&self, key: &CacheKey) -> CacheLookup {
        self.match_among(&LogicalPartition::ALL, key).await
    }

    /// Read from the listed current-generation partitions; the freshest
    /// write wins.
    pub async fn match_among(&self, partitions: &[LogicalPartition], key: &CacheKey) -> CacheLookup {
        let _guard = self.gate.read().await;
        let mut best = CacheLookup::Miss;
        for &logical in partitions {
            let name = PartitionName::new(logical, self.generation.clone());
            if let CacheLookup::Hit { partition, entry } = self.read(&name, key).await {
                let fresher = match &best {
                    CacheLookup::Hit { entry: current, .. } => entry.sequence > current.sequence,
                    CacheLookup::Miss => true,
                };
                if fresher {
                    best = CacheLookup::Hit { partition, entry };
                }
            }
        }
        best
    }

    async fn read(&self, name: &PartitionName, key: &CacheKey) -> CacheLookup {
        match self.store.get(&name.as_string(), key.as_str()).await {
            Ok(Some(entry)) => CacheLookup::Hit {
                partition: name.clone(),
                entry,
            },
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                tracing::warn!(partition = %name, key = %key, error = %e, "cache read failed");
                CacheLookup::Miss
            }
        }
    }

    /// Write a full batch into a partition while holding the mutation gate.
    ///
    /// Used by install: either every entry is written or the partition is
    /// dropped again and the error returned.
    pub async fn put_batch(
        &self,
        handle: &PartitionHandle,
        entries: Vec<(CacheKey, CapturedResponse)>,
    ) -> CacheResult<usize> {
        let _guard = self.gate.write().await;
        let partition = handle.name.as_string();
        self.store.open(&partition).await?;

        let mut written = 0;
        for (key, response) in entries {
            let entry = CachedEntry::new(response.cache_copy()).with_sequence(self.next_sequence());
            if let Err(e) = self.store.put(&partition, key.as_str(), entry).await {
                tracing::warn!(partition = %partition, key = %key, error = %e, "batch write failed");
                if let Err(e) = self.store.delete(&partition).await {
                    tracing::warn!(partition = %partition, error = %e, "failed to drop partial partition");
                }
                return Err(e);
            }
            written += 1;
        }
        Ok(written)
    }

    /// Delete every partition whose generation is not in `current`.
    ///
    /// Names outside the `<logical>-<generation>` layout are legacy and are
    /// deleted too. Returns the deleted names. Holds the mutation gate for
    /// the whole sweep, so no request observes old and new partitions side
    /// by side.
    pub async fn evict_stale(&self, current: &[&str]) -> Vec<String> {
        let _guard = self.gate.write().await;

        let names = match self.store.partitions().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "failed to enumerate partitions");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        for name in names {
            let keep = PartitionName::parse(&name)
                .map(|p| current.contains(&p.generation.as_str()))
                .unwrap_or(false);
            if keep {
                continue;
            }
            match self.store.delete(&name).await {
                Ok(_) => {
                    tracing::info!(partition = %name, "evicted stale partition");
                    deleted.push(name);
                }
                Err(e) => tracing::warn!(partition = %name, error = %e, "failed to evict partition"),
            }
        }
        deleted
    }

    /// Drop every entry of the current partition for `logical`.
    ///
    /// Invalidating a partition that does not exist succeeds with `false`.
    pub async fn invalidate(&self, logical: LogicalPartition) -> CacheResult<bool> {
        let _guard = self.gate.write().await;
        let name = self.handle(logical).name.as_string();
        let existed = self.store.delete(&name).await?;
        tracing::info!(partition = %name, existed, "invalidated partition");
        Ok(existed)
    }

    /// Keys stored in a partition; storage failures read as empty.
    pub async fn keys(&self, handle: &PartitionHandle) -> Vec<String> {
        let _guard = self.gate.read().await;
        self.store
            .keys(&handle.name.as_string())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(partition = %handle, error = %e, "failed to list keys");
                Vec::new()
            })
    }

    /// Entry counts of every stored partition, current or not.
    pub async fn inventory(&self) -> CacheResult<Vec<PartitionSummary>> {
        let _guard = self.gate.read().await;
        let mut summaries = Vec::new();
        for name in self.store.partitions().await? {
            let entries = self.store.keys(&name).await?.len();
            summaries.push(PartitionSummary { name, entries });
        }
        Ok(summaries)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}
