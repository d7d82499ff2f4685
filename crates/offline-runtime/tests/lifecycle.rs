//! Install, activation and control message scenarios.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{activated, config, get, runtime_with, Script, ScriptedNetwork, SpyStore, Write};
use http::StatusCode;
use offline_cache::{CacheKey, CachedEntry, LogicalPartition, PartitionStore};
use offline_core::{AssetManifest, CapturedResponse, LifecycleState, RequestMode, ResponseSource};
use offline_runtime::{reply_port, ControlMessage, ControlReply, RuntimeError};

#[tokio::test]
async fn install_writes_exactly_the_manifest() {
    let (runtime, _, _) = activated(&["/a.js", "/b.css"]).await;

    let statics = runtime.manager().handle(LogicalPartition::Static);
    assert_eq!(
        runtime.manager().keys(&statics).await,
        vec!["/a.js".to_string(), "/b.css".to_string()]
    );
}

#[tokio::test]
async fn install_is_atomic() {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    network.respond("/a.js", "a");
    // "/b.css" is unscripted and fails.

    let runtime = runtime_with(config(), store.clone(), network);
    let err = runtime
        .install_with_manifest(&AssetManifest::new(["/a.js", "/b.css"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::AssetFetch { ref path, .. } if path == "/b.css"));
    assert!(store.writes().is_empty());
    assert_eq!(runtime.state(), LifecycleState::Redundant);
}

#[tokio::test]
async fn install_skips_denylisted_entries() {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    for path in ["/a.js", "/sw.js", "/admin/index.html"] {
        network.respond(path, path);
    }

    let runtime = runtime_with(config(), store.clone(), network.clone());
    let written = runtime
        .install_with_manifest(&AssetManifest::new(["/a.js", "/sw.js", "/admin/index.html"]))
        .await
        .unwrap();

    assert_eq!(written, 1);
    assert_eq!(
        store.writes(),
        vec![Write {
            partition: "static-v6".to_string(),
            key: "/a.js".to_string(),
        }]
    );
    assert_eq!(network.calls_to("/sw.js"), 0);
    assert_eq!(network.calls_to("/admin/index.html"), 0);
}

#[tokio::test(start_paused = true)]
async fn install_asset_fetches_are_bounded() {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    network.respond("/a.js", "a");
    network.script(
        "/b.css",
        Script::Slow(Duration::from_secs(3600), CapturedResponse::ok("b")),
    );

    let runtime = runtime_with(config(), store.clone(), network);
    let err = runtime
        .install_with_manifest(&AssetManifest::new(["/a.js", "/b.css"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::AssetFetch { ref path, .. } if path == "/b.css"));
    assert!(store.writes().is_empty());
    assert_eq!(runtime.state(), LifecycleState::Redundant);
}

#[tokio::test]
async fn install_fails_on_bad_manifest() {
    let network = ScriptedNetwork::new();
    network.respond("/asset-manifest.json", r#"{"files":["/a.js",""]}"#);
    let runtime = runtime_with(config(), SpyStore::new(), network);

    assert!(runtime.on_install().await.is_err());
    assert_eq!(runtime.state(), LifecycleState::Redundant);
}

#[tokio::test]
async fn activation_evicts_previous_generation() {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    network.respond("/a.js", "a");
    network.respond("/data/product_data.json", "{}");

    let v6 = runtime_with(config(), store.clone(), network.clone());
    v6.install_with_manifest(&AssetManifest::new(["/a.js"])).await.unwrap();
    v6.on_activate().await.unwrap();
    v6.on_fetch(&get("/data/product_data.json")).await;
    store
        .put("product-cache", "/legacy", CachedEntry::new(CapturedResponse::ok("old")))
        .await
        .unwrap();

    let v7 = runtime_with(config().with_generation("v7"), store.clone(), network);
    v7.install_with_manifest(&AssetManifest::new(["/a.js"])).await.unwrap();
    let mut evicted = v7.on_activate().await.unwrap();
    evicted.sort();
    assert_eq!(evicted, vec!["data-v6", "product-cache", "static-v6"]);

    let names = store.partitions().await.unwrap();
    assert!(names.iter().all(|name| !name.ends_with("-v6")));
    assert_eq!(names, vec!["static-v7".to_string()]);

    let statics = v7.manager().handle(LogicalPartition::Static);
    assert!(v7.manager().match_in(&statics, &CacheKey::new("/a.js")).await.is_hit());
    assert_eq!(v7.metrics().evicted, 3);
}

#[tokio::test]
async fn concurrent_readers_see_all_or_none_of_the_old_generation() {
    for activate_first in [true, false] {
        let store = SpyStore::new();
        let network = ScriptedNetwork::new();
        network.respond("/a.js", "a");
        network.respond("/data/product_data.json", "{}");

        let v6 = runtime_with(config(), store.clone(), network.clone());
        v6.install_with_manifest(&AssetManifest::new(["/a.js"])).await.unwrap();
        v6.on_activate().await.unwrap();
        v6.on_fetch(&get("/data/product_data.json")).await;

        let v7 = runtime_with(config().with_generation("v7"), store.clone(), network);
        v7.install_with_manifest(&AssetManifest::new(["/a.js"])).await.unwrap();

        let inventory = if activate_first {
            let (evicted, inventory) = tokio::join!(v7.on_activate(), v7.inventory());
            assert_eq!(evicted.unwrap().len(), 2);
            inventory
        } else {
            let (inventory, evicted) = tokio::join!(v7.inventory(), v7.on_activate());
            assert_eq!(evicted.unwrap().len(), 2);
            inventory
        };

        let old = inventory
            .unwrap()
            .iter()
            .filter(|summary| summary.name.ends_with("-v6"))
            .count();
        assert!(old == 0 || old == 2, "saw {old} of 2 old partitions");
        assert!(store.partitions().await.unwrap().iter().all(|name| !name.ends_with("-v6")));
    }
}

#[tokio::test]
async fn invalidation_and_fetch_never_interleave() {
    for invalidate_first in [true, false] {
        let (runtime, _, network) = activated(&[]).await;
        network.respond("/data/product_data.json", r#"{"version":"1"}"#);
        let request = get("/data/product_data.json");
        runtime.on_fetch(&request).await;
        network.set_offline(true);

        let response = if invalidate_first {
            let (reply, response) = tokio::join!(
                runtime.on_message(ControlMessage::InvalidateProductCache, None),
                runtime.on_fetch(&request)
            );
            assert!(reply.is_ok());
            response
        } else {
            let (response, reply) = tokio::join!(
                runtime.on_fetch(&request),
                runtime.on_message(ControlMessage::InvalidateProductCache, None)
            );
            assert!(reply.is_ok());
            response
        };

        // Either the whole old copy or the offline body, nothing in between.
        if response.status == StatusCode::OK {
            assert_eq!(&response.body[..], br#"{"version":"1"}"#);
        } else {
            assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        }
        let data = runtime.manager().handle(LogicalPartition::Data);
        assert!(runtime.manager().keys(&data).await.is_empty());
    }
}

#[tokio::test]
async fn fetches_before_activation_pass_through() {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    network.respond("/a.js", "a");
    network.respond("/assets/app.js", "app");
    let runtime = runtime_with(config(), store.clone(), network.clone());
    runtime.install_with_manifest(&AssetManifest::new(["/a.js"])).await.unwrap();
    let writes_after_install = store.writes().len();

    let response = runtime.on_fetch(&get("/assets/app.js")).await;
    assert_eq!(&response.body[..], b"app");
    assert_eq!(response.source, ResponseSource::Network);
    assert_eq!(store.writes().len(), writes_after_install);
}

#[tokio::test]
async fn skip_waiting_during_install_activates_after_install() {
    let network = ScriptedNetwork::new();
    network.respond("/a.js", "a");
    let runtime = runtime_with(config(), SpyStore::new(), network);

    let reply = runtime.on_message(ControlMessage::SkipWaiting, None).await;
    assert!(reply.is_ok());
    assert_eq!(runtime.state(), LifecycleState::Parsed);

    runtime.install_with_manifest(&AssetManifest::new(["/a.js"])).await.unwrap();
    assert_eq!(runtime.state(), LifecycleState::Activated);
}

#[tokio::test]
async fn invalidate_product_cache_forces_network_fetch() {
    let (runtime, _, network) = activated(&[]).await;
    network.respond("/data/product_data.json", r#"{"version":"1"}"#);
    runtime.on_fetch(&get("/data/product_data.json")).await;

    let (port, receiver) = reply_port();
    runtime.on_message(ControlMessage::InvalidateProductCache, Some(port)).await;
    assert_eq!(receiver.await.unwrap(), ControlReply::ok());

    let data = runtime.manager().handle(LogicalPartition::Data);
    let key = runtime.cache_key(&get("/data/product_data.json"));
    assert!(!runtime.manager().match_in(&data, &key).await.is_hit());

    // With the copy gone, an offline request can only get the offline body.
    network.set_offline(true);
    let response = runtime.on_fetch(&get("/data/product_data.json")).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    network.set_offline(false);
    let calls_before = network.calls_to("/data/product_data.json");
    runtime.on_fetch(&get("/data/product_data.json")).await;
    assert_eq!(network.calls_to("/data/product_data.json"), calls_before + 1);
    assert_eq!(runtime.metrics().invalidations, 1);
}

#[tokio::test]
async fn invalidating_missing_partition_succeeds() {
    let (runtime, _, _) = activated(&[]).await;
    let reply = runtime
        .on_message(
            ControlMessage::InvalidatePartition {
                partition: "images".to_string(),
            },
            None,
        )
        .await;
    assert!(reply.is_ok());
}

#[tokio::test]
async fn invalidating_unknown_partition_fails() {
    let (runtime, _, _) = activated(&[]).await;
    let reply = runtime
        .on_message(
            ControlMessage::InvalidatePartition {
                partition: "sessions".to_string(),
            },
            None,
        )
        .await;
    assert_eq!(reply, ControlReply::failed("unknown partition: sessions"));
}

#[tokio::test]
async fn get_version_reports_generation_and_state() {
    let (runtime, _, _) = activated(&[]).await;
    let reply = runtime.on_message(ControlMessage::GetVersion, None).await;
    assert_eq!(
        reply,
        ControlReply::Version {
            generation: "v6".to_string(),
            state: LifecycleState::Activated,
        }
    );
}

#[tokio::test]
async fn explain_headers_when_enabled() {
    let store = SpyStore::new();
    let network = ScriptedNetwork::new();
    network.respond("/index.html", "shell");
    let mut config = config();
    config.explain_headers = true;

    let runtime = Arc::new(runtime_with(config, store, network.clone()));
    runtime.install_with_manifest(&AssetManifest::new(["/index.html"])).await.unwrap();
    runtime.on_activate().await.unwrap();

    network.set_offline(true);
    let response = runtime.on_fetch(&get("/cart").with_mode(RequestMode::Navigate)).await;
    assert_eq!(response.header("x-cache-status"), Some("STALE"));
    assert_eq!(response.header("x-cache-partition"), Some("static-v6"));
    assert_eq!(response.header("x-cache-key"), Some("/cart"));
}
