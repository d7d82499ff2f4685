//! Partitioned response cache for the storefront offline runtime.
//!
//! This crate provides:
//! - `CacheKey` / `KeyNormalizer` - Deterministic cache key normalization
//! - `PartitionName` / `LogicalPartition` - Generation-tagged partition naming
//! - `PartitionStore` - Storage backend trait, with `MemoryStore`
//! - `CacheStoreManager` - Open, read, write, evict and invalidate partitions
//! - `ClassPolicy` - Per routing class strategy configuration
//! - `CacheExplainHeaders` - Debug headers for cache behavior
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use offline_cache::{CacheStoreManager, LogicalPartition, MemoryStore};
//!
//! let manager = CacheStoreManager::new(Arc::new(MemoryStore::new()), "v6");
//! let statics = manager.open(LogicalPartition::Static).await;
//! manager.put(&statics, &key, &response).await;
//! let deleted = manager.evict_stale(&["v6"]).await;
//! ```

mod headers;
mod key;
mod manager;
mod partition;
mod policy;
mod store;

pub use headers::*;
pub use key::*;
pub use manager::*;
pub use partition::*;
pub use policy::*;
pub use store::*;
