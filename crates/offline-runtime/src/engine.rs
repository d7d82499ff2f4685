//! Strategy engine.
//!
//! Executes the per-class caching strategy for one intercepted request:
//! cache-first for static assets and images, network-first with cache
//! fallback for navigations and the data endpoint, network-only for
//! bypassed requests. Every path ends in a response; storage and network
//! failures only change which step produces it.

use std::sync::Arc;

use http::Method;
use offline_cache::{
    CacheExplainHeaders, CacheKey, CacheLookup, CacheStatus, CacheStoreManager, ClassPolicy,
    KeyNormalizer, LastResort, LogicalPartition, PartitionHandle, StrategyKind,
};
use offline_core::{CapturedResponse, CoreError, RequestDescriptor, ResponseSource, RoutingClass, RuntimeConfig};
use offline_fetch::{fetch_with_policy, FetchError, FetchPolicy, Network, RetryPolicy};
use offline_observability::RuntimeMetrics;
use url::Url;

use crate::error::RuntimeResult;
use crate::fallback::FallbackResponses;

const PAGE_PARTITIONS: [LogicalPartition; 2] = [LogicalPartition::Runtime, LogicalPartition::Static];

/// A response plus what the cache had to do with it.
#[derive(Debug)]
struct Served {
    response: CapturedResponse,
    status: CacheStatus,
    partition: Option<String>,
    age_secs: Option<u64>,
}

impl Served {
    fn network(response: CapturedResponse) -> Self {
        Self {
            response,
            status: CacheStatus::Miss,
            partition: None,
            age_secs: None,
        }
    }

    fn synthetic(response: CapturedResponse) -> Self {
        Self {
            response,
            status: CacheStatus::Offline,
            partition: None,
            age_secs: None,
        }
    }

    /// `None` when the lookup missed.
    fn from_lookup(lookup: CacheLookup, status: CacheStatus) -> Option<Self> {
        match lookup {
            CacheLookup::Hit { partition, entry } => {
                let name = partition.as_string();
                Some(Self {
                    age_secs: Some(entry.age_secs()),
                    response: entry.response.with_source(ResponseSource::Cache(name.clone())),
                    status,
                    partition: Some(name),
                })
            }
            CacheLookup::Miss => None,
        }
    }
}

/// Applies caching strategies on behalf of the runtime.
pub struct StrategyEngine {
    config: Arc<RuntimeConfig>,
    normalizer: KeyNormalizer,
    manager: Arc<CacheStoreManager>,
    network: Arc<dyn Network>,
    fallbacks: FallbackResponses,
    metrics: Arc<RuntimeMetrics>,
}

impl StrategyEngine {
    pub fn new(
        config: Arc<RuntimeConfig>,
        manager: Arc<CacheStoreManager>,
        network: Arc<dyn Network>,
        metrics: Arc<RuntimeMetrics>,
    ) -> RuntimeResult<Self> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| CoreError::InvalidConfig(format!("origin: {e}")))?;
        Ok(Self {
            normalizer: KeyNormalizer::new(origin, config.query.clone()),
            fallbacks: FallbackResponses::from_config(&config),
            config,
            manager,
            network,
            metrics,
        })
    }

    /// Key normalizer in use.
    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    /// Normalized cache key of a request.
    pub fn cache_key(&self, request: &RequestDescriptor) -> CacheKey {
        self.normalizer.normalize(&request.url)
    }

    /// Produce the response for a classified request.
    pub async fn handle(&self, request: &RequestDescriptor, class: RoutingClass) -> CapturedResponse {
        let policy = ClassPolicy::for_class(class, &self.config);
        let handle = match policy.partition {
            Some(logical) if policy.writes_cache() => self.manager.handle(logical),
            _ => return self.pass_through(request).await,
        };

        let key = self.cache_key(request);
        let served = match policy.strategy {
            StrategyKind::CacheFirst => self.cache_first(request, &key, &handle, &policy).await,
            StrategyKind::NetworkFirst => self.network_first(request, &key, &handle, &policy).await,
            StrategyKind::NetworkOnly => return self.pass_through(request).await,
        };

        let span = tracing::Span::current();
        span.record("status", served.response.status.as_u16());
        span.record("cache", tracing::field::display(served.status));
        tracing::debug!(
            class = %class,
            key = %key,
            status = %served.response.status,
            cache = %served.status,
            "served"
        );

        self.finish(served, &key)
    }

    fn finish(&self, served: Served, key: &CacheKey) -> CapturedResponse {
        let mut response = served.response;
        if self.config.explain_headers {
            let mut explain = CacheExplainHeaders::new().with_status(served.status).with_key(key);
            explain.partition = served.partition;
            explain.age_secs = served.age_secs;
            explain.apply(&mut response);
        }
        response
    }

    /// Network only. Never read from or written to a partition.
    async fn pass_through(&self, request: &RequestDescriptor) -> CapturedResponse {
        self.metrics.record_bypass();
        self.metrics.record_network_fetch();
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_network_failure();
                tracing::warn!(url = %request.url, error = %e, "bypass fetch failed");
                self.fallbacks.render(LastResort::BadGateway)
            }
        }
    }

    async fn cache_first(
        &self,
        request: &RequestDescriptor,
        key: &CacheKey,
        handle: &PartitionHandle,
        policy: &ClassPolicy,
    ) -> Served {
        if let Some(served) = Served::from_lookup(self.manager.match_in(handle, key).await, CacheStatus::Hit) {
            self.metrics.record_hit();
            return served;
        }
        self.metrics.record_miss();

        match self.fetch(request, policy).await {
            Ok(response) => {
                self.store(request, key, handle, &response, false).await;
                Served::network(response)
            }
            Err(e) => {
                tracing::warn!(partition = %handle, key = %key, error = %e, "network failed on cache miss");
                self.last_resort(policy.last_resort)
            }
        }
    }

    async fn network_first(
        &self,
        request: &RequestDescriptor,
        key: &CacheKey,
        handle: &PartitionHandle,
        policy: &ClassPolicy,
    ) -> Served {
        let data = policy.last_resort == LastResort::OfflineJson;

        let failure = match self.fetch(request, policy).await {
            Ok(response) if response.is_success() => {
                self.store(request, key, handle, &response, data).await;
                return Served::network(response);
            }
            Ok(response) if data => {
                // A non-2xx data response never replaces a healthy copy.
                if let Some(served) = self.last_known_good(key, handle).await {
                    tracing::info!(key = %key, status = %response.status, "serving last known good data");
                    self.metrics.record_fallback();
                    return served;
                }
                return Served::network(response);
            }
            Ok(response) => return Served::network(response),
            Err(e) => e,
        };

        tracing::warn!(partition = %handle, key = %key, error = %failure, "network failed, trying cache");

        let cached = if data {
            self.last_known_good(key, handle).await
        } else {
            self.cached_page(key).await
        };
        match cached {
            Some(served) => {
                self.metrics.record_fallback();
                served
            }
            None => self.last_resort(policy.last_resort),
        }
    }

    async fn last_known_good(&self, key: &CacheKey, handle: &PartitionHandle) -> Option<Served> {
        match self.manager.match_in(handle, key).await {
            CacheLookup::Hit { entry, .. } if !entry.last_known_good => None,
            lookup => Served::from_lookup(lookup, CacheStatus::Stale),
        }
    }

    /// Cached copy of the page itself, then each configured shell document.
    ///
    /// Only partitions that hold documents are searched.
    async fn cached_page(&self, key: &CacheKey) -> Option<Served> {
        let lookup = self.manager.match_among(&PAGE_PARTITIONS, key).await;
        if let Some(served) = Served::from_lookup(lookup, CacheStatus::Stale) {
            return Some(served);
        }
        for path in &self.config.shell_paths {
            let Some(shell) = self.normalizer.normalize_path(path) else {
                continue;
            };
            let lookup = self.manager.match_among(&PAGE_PARTITIONS, &shell).await;
            if let Some(served) = Served::from_lookup(lookup, CacheStatus::Stale) {
                tracing::info!(shell = %shell, "serving cached shell");
                return Some(served);
            }
        }
        None
    }

    fn last_resort(&self, last_resort: LastResort) -> Served {
        self.metrics.record_fallback();
        if last_resort == LastResort::PlaceholderImage {
            self.metrics.record_placeholder();
        }
        Served::synthetic(self.fallbacks.render(last_resort))
    }

    async fn fetch(&self, request: &RequestDescriptor, policy: &ClassPolicy) -> Result<CapturedResponse, FetchError> {
        let retry = if policy.retries > 0 {
            RetryPolicy::new(policy.retries)
        } else {
            RetryPolicy::none()
        };
        self.metrics.record_network_fetch();
        let result = fetch_with_policy(self.network.as_ref(), request, &FetchPolicy::new(policy.timeout, retry)).await;
        if result.is_err() {
            self.metrics.record_network_failure();
        }
        result
    }

    /// Write a successful `GET` response. Anything else is returned uncached.
    async fn store(
        &self,
        request: &RequestDescriptor,
        key: &CacheKey,
        handle: &PartitionHandle,
        response: &CapturedResponse,
        last_known_good: bool,
    ) {
        if request.method != Method::GET || !response.is_success() {
            return;
        }
        let written = if last_known_good {
            self.manager.put_last_known_good(handle, key, response).await
        } else {
            self.manager.put(handle, key, response).await
        };
        if !written {
            self.metrics.record_write_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use http::StatusCode;
    use offline_cache::MemoryStore;

    /// Answers from a fixed table; anything else fails to connect.
    #[derive(Default)]
    struct TableNetwork {
        routes: Mutex<Vec<(String, CapturedResponse)>>,
        seen: Mutex<Vec<String>>,
    }

    impl TableNetwork {
        fn route(self, path: &str, response: CapturedResponse) -> Self {
            self.routes.lock().unwrap().push((path.to_string(), response));
            self
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Network for TableNetwork {
        async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, FetchError> {
            self.seen.lock().unwrap().push(request.url.to_string());
            self.routes
                .lock()
                .unwrap()
                .iter()
                .find(|(path, _)| path == request.path())
                .map(|(_, response)| response.clone())
                .ok_or_else(|| FetchError::Connection("unreachable".into()))
        }
    }

    fn engine(network: Arc<TableNetwork>, explain: bool) -> (StrategyEngine, Arc<CacheStoreManager>) {
        let mut config = RuntimeConfig::for_origin("https://shop.example");
        config.explain_headers = explain;
        let manager = Arc::new(CacheStoreManager::new(Arc::new(MemoryStore::new()), "v6"));
        let engine = StrategyEngine::new(
            Arc::new(config),
            manager.clone(),
            network,
            Arc::new(RuntimeMetrics::new()),
        )
        .unwrap();
        (engine, manager)
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(url).unwrap()
    }

    #[tokio::test]
    async fn test_non_success_is_not_cached() {
        let network = Arc::new(
            TableNetwork::default().route("/assets/gone.js", CapturedResponse::new(StatusCode::NOT_FOUND, "")),
        );
        let (engine, manager) = engine(network.clone(), false);

        let request = get("https://shop.example/assets/gone.js");
        let response = engine.handle(&request, RoutingClass::StaticAsset).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let statics = manager.handle(LogicalPartition::Static);
        assert!(manager.keys(&statics).await.is_empty());
    }

    #[tokio::test]
    async fn test_explain_headers_on_hit() {
        let network = Arc::new(TableNetwork::default().route("/assets/app.js", CapturedResponse::ok("js")));
        let (engine, _) = engine(network.clone(), true);

        let request = get("https://shop.example/assets/app.js?v=3");
        let first = engine.handle(&request, RoutingClass::StaticAsset).await;
        assert_eq!(first.header("x-cache-status"), Some("MISS"));

        let second = engine.handle(&request, RoutingClass::StaticAsset).await;
        assert_eq!(second.header("x-cache-status"), Some("HIT"));
        assert_eq!(second.header("x-cache-key"), Some("/assets/app.js"));
        assert_eq!(second.header("x-cache-partition"), Some("static-v6"));
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_bypass_is_never_annotated() {
        let network = Arc::new(TableNetwork::default().route("/admin", CapturedResponse::ok("admin")));
        let (engine, _) = engine(network, true);

        let response = engine.handle(&get("https://shop.example/admin"), RoutingClass::Bypass).await;
        assert_eq!(response.header("x-cache-status"), None);
        assert_eq!(&response.body[..], b"admin");
    }

    #[tokio::test]
    async fn test_bypass_network_failure_is_502() {
        let (engine, _) = engine(Arc::new(TableNetwork::default()), false);
        let response = engine.handle(&get("https://shop.example/api/cart"), RoutingClass::Bypass).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_data_error_status_serves_last_known_good() {
        let network = Arc::new(
            TableNetwork::default().route("/data/product_data.json", CapturedResponse::ok(r#"{"version":1}"#)),
        );
        let (engine, _) = engine(network.clone(), false);
        let request = get("https://shop.example/data/product_data.json");
        engine.handle(&request, RoutingClass::DataEndpoint).await;

        network.routes.lock().unwrap()[0].1 = CapturedResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let response = engine.handle(&request, RoutingClass::DataEndpoint).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], br#"{"version":1}"#);
        assert_eq!(response.source, ResponseSource::Cache("data-v6".to_string()));
    }

    #[tokio::test]
    async fn test_data_offline_without_cache_is_503_json() {
        let (engine, _) = engine(Arc::new(TableNetwork::default()), false);
        let request = get("https://shop.example/data/product_data.json");
        let response = engine.handle(&request, RoutingClass::DataEndpoint).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&response.body[..], br#"{"error":"offline"}"#);
    }

    #[tokio::test]
    async fn test_head_response_is_not_written() {
        let network = Arc::new(TableNetwork::default().route("/assets/app.js", CapturedResponse::ok("")));
        let (engine, manager) = engine(network, false);

        let request = RequestDescriptor::new(Method::HEAD, "https://shop.example/assets/app.js").unwrap();
        engine.handle(&request, RoutingClass::StaticAsset).await;
        assert!(manager.keys(&manager.handle(LogicalPartition::Static)).await.is_empty());
    }

    #[tokio::test]
    async fn test_navigation_fallback_skips_data_and_images() {
        let (engine, manager) = engine(Arc::new(TableNetwork::default()), false);
        let request = get("https://shop.example/data/product_data.json").with_mode(offline_core::RequestMode::Navigate);
        let key = engine.cache_key(&request);
        manager
            .put(&manager.handle(LogicalPartition::Data), &key, &CapturedResponse::ok(r#"{"version":1}"#))
            .await;

        let response = engine.handle(&request, RoutingClass::Navigation).await;
        assert_eq!(response.source, ResponseSource::Synthetic);
        assert_ne!(&response.body[..], br#"{"version":1}"#);

        manager
            .put(&manager.handle(LogicalPartition::Runtime), &key, &CapturedResponse::ok("<html>page</html>"))
            .await;
        let response = engine.handle(&request, RoutingClass::Navigation).await;
        assert_eq!(&response.body[..], b"<html>page</html>");
        assert_eq!(response.source, ResponseSource::Cache("runtime-v6".to_string()));
    }
}
