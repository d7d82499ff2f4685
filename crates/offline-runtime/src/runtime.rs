//! The offline runtime: one owned instance per build generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::try_join_all;
use http::Method;
use offline_cache::{CacheKey, CacheStoreManager, LogicalPartition, PartitionStore, PartitionSummary};
use offline_core::{
    AssetManifest, CapturedResponse, CoreError, LifecycleState, RequestDescriptor, RoutingClass, RuntimeConfig,
};
use offline_fetch::{fetch_with_policy, FetchPolicy, Network};
use offline_observability::{lifecycle_span, request_span, MetricsSnapshot, RuntimeMetrics};
use tokio::sync::Mutex;
use tracing::Instrument;
use url::Url;

use crate::classifier::RequestClassifier;
use crate::control::{send_reply, ControlMessage, ControlReply, ReplyPort};
use crate::engine::StrategyEngine;
use crate::error::{RuntimeError, RuntimeResult};

/// An event delivered to the runtime.
#[derive(Debug)]
pub enum RuntimeEvent {
    Install,
    Activate,
    Fetch(RequestDescriptor),
    Message(ControlMessage, Option<ReplyPort>),
}

/// What handling an event produced.
#[derive(Debug)]
pub enum EventOutcome {
    /// Number of assets written to the static partition.
    Installed(usize),
    /// Names of the partitions deleted on activation.
    Activated(Vec<String>),
    Response(CapturedResponse),
    Reply(ControlReply),
}

/// Intercepts requests for one build generation.
///
/// Holds the immutable configuration and its four collaborators: the
/// classifier, the cache store manager, the strategy engine and the
/// control channel handlers below.
pub struct OfflineRuntime {
    config: Arc<RuntimeConfig>,
    origin: Url,
    classifier: RequestClassifier,
    manager: Arc<CacheStoreManager>,
    engine: StrategyEngine,
    network: Arc<dyn Network>,
    metrics: Arc<RuntimeMetrics>,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
    /// Serializes activation and partition-clearing messages.
    mutations: Mutex<()>,
}

impl OfflineRuntime {
    /// Build a runtime over a storage backend and a network.
    pub fn new(
        config: RuntimeConfig,
        store: Arc<dyn PartitionStore>,
        network: Arc<dyn Network>,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        let origin = Url::parse(&config.origin)
            .map_err(|e| CoreError::InvalidConfig(format!("origin: {e}")))?;

        let config = Arc::new(config);
        let metrics = Arc::new(RuntimeMetrics::new());
        let manager = Arc::new(CacheStoreManager::new(store, config.generation.clone()));
        let engine = StrategyEngine::new(config.clone(), manager.clone(), network.clone(), metrics.clone())?;

        Ok(Self {
            classifier: RequestClassifier::from_config(&config),
            origin,
            config,
            manager,
            engine,
            network,
            metrics,
            state: RwLock::new(LifecycleState::Parsed),
            skip_waiting: AtomicBool::new(false),
            mutations: Mutex::new(()),
        })
    }

    /// Route an event to its handler and wait for it to finish.
    pub async fn dispatch(&self, event: RuntimeEvent) -> RuntimeResult<EventOutcome> {
        match event {
            RuntimeEvent::Install => self.on_install().await.map(EventOutcome::Installed),
            RuntimeEvent::Activate => self.on_activate().await.map(EventOutcome::Activated),
            RuntimeEvent::Fetch(request) => Ok(EventOutcome::Response(self.on_fetch(&request).await)),
            RuntimeEvent::Message(message, reply) => {
                Ok(EventOutcome::Reply(self.on_message(message, reply).await))
            }
        }
    }

    /// Fetch the asset manifest and warm the static partition from it.
    pub async fn on_install(&self) -> RuntimeResult<usize> {
        self.transition(LifecycleState::Parsed, LifecycleState::Installing)?;
        let span = lifecycle_span("install", &self.config.generation);
        let result = async {
            let manifest = self.fetch_manifest().await?;
            self.install(&manifest).await
        }
        .instrument(span)
        .await;
        self.finish_install(result).await
    }

    /// Warm the static partition from an already loaded manifest.
    pub async fn install_with_manifest(&self, manifest: &AssetManifest) -> RuntimeResult<usize> {
        self.transition(LifecycleState::Parsed, LifecycleState::Installing)?;
        let span = lifecycle_span("install", &self.config.generation);
        let result = self.install(manifest).instrument(span).await;
        self.finish_install(result).await
    }

    async fn fetch_manifest(&self) -> RuntimeResult<AssetManifest> {
        let url = self.join(&self.config.manifest_path)?;
        let request = RequestDescriptor::from_url(Method::GET, url);
        let policy = FetchPolicy::bounded(self.config.install_timeout());

        let response = fetch_with_policy(self.network.as_ref(), &request, &policy)
            .await
            .map_err(|e| RuntimeError::ManifestFetch(e.to_string()))?;
        if !response.is_success() {
            return Err(RuntimeError::ManifestFetch(format!("status {}", response.status)));
        }
        Ok(AssetManifest::from_json(&response.body)?)
    }

    /// Fetch every asset, then write them all at once.
    ///
    /// Denylisted entries are skipped. Same-origin paths that were written
    /// are handed to the classifier as static assets.
    async fn install(&self, manifest: &AssetManifest) -> RuntimeResult<usize> {
        manifest.validate()?;

        let mut targets = Vec::new();
        for path in manifest.unique_files() {
            let url = self.join(path)?;
            if self.classifier.denylist().is_denied(url.path()) {
                tracing::warn!(path, "denylisted manifest entry not precached");
                continue;
            }
            targets.push((path, url));
        }

        let policy = FetchPolicy::bounded(self.config.install_timeout());
        let policy = &policy;
        let fetches = targets.into_iter().map(|(path, url)| async move {
            let key = self.engine.normalizer().normalize(&url);
            let local = (url.origin() == self.origin.origin()).then(|| url.path().to_string());
            let request = RequestDescriptor::from_url(Method::GET, url);

            self.metrics.record_network_fetch();
            let response = fetch_with_policy(self.network.as_ref(), &request, policy)
                .await
                .map_err(|e| {
                    self.metrics.record_network_failure();
                    RuntimeError::AssetFetch {
                        path: path.to_string(),
                        reason: e.to_string(),
                    }
                })?;
            if !response.is_success() {
                return Err(RuntimeError::AssetFetch {
                    path: path.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            Ok::<_, RuntimeError>((local, (key, response)))
        });
        let (local, entries): (Vec<Option<String>>, Vec<(CacheKey, CapturedResponse)>) =
            try_join_all(fetches).await?.into_iter().unzip();

        let handle = self.manager.open(LogicalPartition::Static).await;
        let written = self.manager.put_batch(&handle, entries).await?;
        self.classifier.precache(local.into_iter().flatten());
        tracing::info!(partition = %handle, assets = written, "static partition warmed");
        Ok(written)
    }

    async fn finish_install(&self, result: RuntimeResult<usize>) -> RuntimeResult<usize> {
        let written = match result {
            Ok(written) => written,
            Err(e) => {
                tracing::error!(generation = %self.config.generation, error = %e, "install failed");
                self.transition(LifecycleState::Installing, LifecycleState::Redundant)?;
                return Err(e);
            }
        };

        let activate_now = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = LifecycleState::Installed;
            self.skip_waiting.load(Ordering::SeqCst)
        };
        tracing::info!(generation = %self.config.generation, "installed");

        if activate_now {
            self.on_activate().await?;
        }
        Ok(written)
    }

    /// Delete stale partitions and start controlling requests.
    ///
    /// Returns only after every stale partition is gone. Activating an
    /// already active runtime is a no-op.
    pub async fn on_activate(&self) -> RuntimeResult<Vec<String>> {
        let _queue = self.mutations.lock().await;
        if self.state() == LifecycleState::Activated {
            return Ok(Vec::new());
        }
        self.transition(LifecycleState::Installed, LifecycleState::Activating)?;

        let span = lifecycle_span("activate", &self.config.generation);
        let evicted = self
            .manager
            .evict_stale(&[self.config.generation.as_str()])
            .instrument(span)
            .await;
        self.metrics.record_evicted(evicted.len());

        self.transition(LifecycleState::Activating, LifecycleState::Activated)?;
        tracing::info!(generation = %self.config.generation, evicted = evicted.len(), "activated");
        Ok(evicted)
    }

    /// Handle an intercepted request. Always produces a response.
    pub async fn on_fetch(&self, request: &RequestDescriptor) -> CapturedResponse {
        let span = request_span(request);
        async {
            let class = if self.state().controls_requests() {
                self.classifier.classify(request)
            } else {
                RoutingClass::Bypass
            };
            tracing::Span::current().record("class", class.name());
            self.engine.handle(request, class).await
        }
        .instrument(span)
        .await
    }

    /// Handle a control message, replying on `reply` if supplied.
    pub async fn on_message(&self, message: ControlMessage, reply: Option<ReplyPort>) -> ControlReply {
        tracing::debug!(?message, "control message");
        let answer = match &message {
            ControlMessage::SkipWaiting => self.skip_waiting().await,
            ControlMessage::GetVersion => ControlReply::Version {
                generation: self.config.generation.clone(),
                state: self.state(),
            },
            ControlMessage::InvalidateProductCache | ControlMessage::InvalidatePartition { .. } => {
                match message.invalidation_target() {
                    Some(Ok(logical)) => self.invalidate(logical).await,
                    Some(Err(name)) => ControlReply::failed(format!("unknown partition: {name}")),
                    None => ControlReply::ok(),
                }
            }
        };
        send_reply(reply, answer.clone());
        answer
    }

    async fn skip_waiting(&self) -> ControlReply {
        let state = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if matches!(*state, LifecycleState::Parsed | LifecycleState::Installing) {
                self.skip_waiting.store(true, Ordering::SeqCst);
            }
            *state
        };

        match state {
            LifecycleState::Installed => match self.on_activate().await {
                Ok(_) => ControlReply::ok(),
                Err(e) => ControlReply::failed(e.to_string()),
            },
            LifecycleState::Redundant => ControlReply::failed("install failed; nothing to activate"),
            _ => ControlReply::ok(),
        }
    }

    async fn invalidate(&self, logical: LogicalPartition) -> ControlReply {
        let _queue = self.mutations.lock().await;
        match self.manager.invalidate(logical).await {
            Ok(_) => {
                self.metrics.record_invalidation();
                ControlReply::ok()
            }
            Err(e) => {
                tracing::warn!(partition = %logical, error = %e, "invalidation failed");
                ControlReply::failed(e.to_string())
            }
        }
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> RuntimeResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != from || !from.can_transition_to(to) {
            return Err(RuntimeError::Lifecycle { from: *state, to });
        }
        tracing::debug!(from = %from, to = %to, "lifecycle transition");
        *state = to;
        Ok(())
    }

    fn join(&self, path: &str) -> RuntimeResult<Url> {
        self.origin
            .join(path)
            .map_err(|e| CoreError::InvalidUrl(format!("{path}: {e}")).into())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build generation tag.
    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    pub fn manager(&self) -> &CacheStoreManager {
        &self.manager
    }

    /// Normalized cache key of a request.
    pub fn cache_key(&self, request: &RequestDescriptor) -> CacheKey {
        self.engine.cache_key(request)
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Entry counts of every stored partition.
    pub async fn inventory(&self) -> RuntimeResult<Vec<PartitionSummary>> {
        Ok(self.manager.inventory().await?)
    }
}
