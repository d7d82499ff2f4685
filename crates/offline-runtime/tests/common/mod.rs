//! Test doubles shared by the scenario tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use offline_cache::{CacheResult, CachedEntry, MemoryStore, PartitionStore};
use offline_core::{CapturedResponse, RequestDescriptor, RuntimeConfig};
use offline_fetch::{FetchError, Network};
use offline_runtime::OfflineRuntime;

pub const ORIGIN: &str = "https://shop.example";

/// How the scripted network answers one path.
#[derive(Debug, Clone)]
pub enum Script {
    Respond(CapturedResponse),
    Fail,
    /// Answer only after the delay.
    Slow(Duration, CapturedResponse),
}

/// Network that answers from a script keyed by path.
///
/// Unscripted paths and every request made while offline fail with a
/// connection error. Every attempted URL is recorded, query included.
#[derive(Default)]
pub struct ScriptedNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    offline: Mutex<bool>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, body: &str) {
        self.script(path, Script::Respond(CapturedResponse::ok(body.to_string())));
    }

    pub fn script(&self, path: &str, script: Script) {
        self.scripts.lock().unwrap().insert(path.to_string(), script);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Every URL requested so far.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Number of attempts for a path, any query.
    pub fn calls_to(&self, path: &str) -> usize {
        let prefix = format!("{ORIGIN}{path}");
        self.seen()
            .iter()
            .filter(|url| url.as_str() == prefix || url.starts_with(&format!("{prefix}?")))
            .count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, FetchError> {
        self.seen.lock().unwrap().push(request.url.to_string());
        if *self.offline.lock().unwrap() {
            return Err(FetchError::Connection("offline".into()));
        }
        let script = self.scripts.lock().unwrap().get(request.path()).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Slow(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Script::Fail) | None => Err(FetchError::Connection("unreachable".into())),
        }
    }
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub partition: String,
    pub key: String,
}

/// Partition store that records every write and delegates to memory.
///
/// Listing and deleting yield to the scheduler first, so concurrent
/// operations interleave at those points.
#[derive(Default)]
pub struct SpyStore {
    inner: MemoryStore,
    writes: Mutex<Vec<Write>>,
}

impl SpyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PartitionStore for SpyStore {
    async fn open(&self, partition: &str) -> CacheResult<()> {
        self.inner.open(partition).await
    }

    async fn has(&self, partition: &str) -> CacheResult<bool> {
        self.inner.has(partition).await
    }

    async fn put(&self, partition: &str, key: &str, entry: CachedEntry) -> CacheResult<()> {
        self.writes.lock().unwrap().push(Write {
            partition: partition.to_string(),
            key: key.to_string(),
        });
        self.inner.put(partition, key, entry).await
    }

    async fn get(&self, partition: &str, key: &str) -> CacheResult<Option<CachedEntry>> {
        self.inner.get(partition, key).await
    }

    async fn keys(&self, partition: &str) -> CacheResult<Vec<String>> {
        tokio::task::yield_now().await;
        self.inner.keys(partition).await
    }

    async fn delete(&self, partition: &str) -> CacheResult<bool> {
        tokio::task::yield_now().await;
        self.inner.delete(partition).await
    }

    async fn partitions(&self) -> CacheResult<Vec<String>> {
        self.inner.partitions().await
    }
}

pub fn config() -> RuntimeConfig {
    RuntimeConfig::for_origin(ORIGIN)
}

pub fn runtime_with(config: RuntimeConfig, store: Arc<SpyStore>, network: Arc<ScriptedNetwork>) -> OfflineRuntime {
    OfflineRuntime::new(config, store, network).unwrap()
}

/// Runtime installed from a manifest served by the network and activated.
pub async fn activated(files: &[&str]) -> (OfflineRuntime, Arc<SpyStore>, Arc<ScriptedNetwork>) {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    let manifest = serde_json::json!({ "files": files }).to_string();
    network.respond("/asset-manifest.json", &manifest);
    for file in files {
        network.respond(file, &format!("contents of {file}"));
    }

    let runtime = runtime_with(config(), store.clone(), network.clone());
    runtime.on_install().await.unwrap();
    runtime.on_activate().await.unwrap();
    (runtime, store, network)
}

pub fn get(path: &str) -> RequestDescriptor {
    RequestDescriptor::get(&format!("{ORIGIN}{path}")).unwrap()
}
