//! Install, activate and fetch against a live origin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use offline_cache::MemoryStore;
use offline_core::{CapturedResponse, Destination, RequestDescriptor, RequestMode, ResponseSource};
use offline_fetch::{FetchError, HttpNetwork, Network, TimeoutConfig};
use offline_observability::MetricsSnapshot;
use offline_runtime::OfflineRuntime;
use serde::Serialize;

use super::SimulateArgs;
use crate::context::Context;
use crate::output::{class_badge, format_bytes, status_badge};

const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".webp", ".gif", ".svg"];

/// Network that can be cut off mid-simulation.
struct SwitchableNetwork {
    inner: HttpNetwork,
    offline: AtomicBool,
}

#[async_trait]
impl Network for SwitchableNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, FetchError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("simulated offline".to_string()));
        }
        self.inner.fetch(request).await
    }
}

#[derive(Serialize)]
struct FetchRow {
    pass: &'static str,
    path: String,
    class: &'static str,
    status: u16,
    source: String,
    bytes: usize,
}

#[derive(Serialize)]
struct Report {
    generation: String,
    installed: usize,
    evicted: Vec<String>,
    fetches: Vec<FetchRow>,
    partitions: Vec<offline_cache::PartitionSummary>,
    metrics: MetricsSnapshot,
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.runtime.clone();
    config.origin = args.origin.clone();

    let network = Arc::new(SwitchableNetwork {
        inner: HttpNetwork::new(&TimeoutConfig::from_total(config.install_timeout()))?,
        offline: AtomicBool::new(false),
    });
    let runtime = OfflineRuntime::new(config, Arc::new(MemoryStore::new()), network.clone())
        .context("Failed to build runtime")?;

    let total = if args.offline { 4 } else { 3 };

    ctx.output.step(1, total, &format!("Installing generation {}", runtime.generation()));
    let installed = runtime
        .on_install()
        .await
        .with_context(|| format!("Install from {} failed", args.origin))?;
    ctx.output.success(&format!("Cached {} assets", installed));

    ctx.output.step(2, total, "Activating");
    let evicted = runtime.on_activate().await.context("Activation failed")?;
    for name in &evicted {
        ctx.output.debug(&format!("evicted {}", name));
    }

    ctx.output.step(3, total, "Fetching");
    let mut fetches = fetch_all(&runtime, &args.paths, "online", ctx).await?;

    if args.offline {
        ctx.output.step(4, total, "Fetching with the network cut off");
        network.offline.store(true, Ordering::SeqCst);
        fetches.extend(fetch_all(&runtime, &args.paths, "offline", ctx).await?);
    }

    let report = Report {
        generation: runtime.generation().to_string(),
        installed,
        evicted,
        fetches,
        partitions: runtime.inventory().await?,
        metrics: runtime.metrics(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Partitions");
    for partition in &report.partitions {
        ctx.output.kv(&partition.name, &format!("{} entries", partition.entries));
    }

    ctx.output.header("Metrics");
    for line in report.metrics.to_summary().lines() {
        println!("  {}", line);
    }

    Ok(())
}

async fn fetch_all(
    runtime: &OfflineRuntime,
    paths: &[String],
    pass: &'static str,
    ctx: &Context,
) -> Result<Vec<FetchRow>> {
    let mut rows = Vec::new();
    for path in paths {
        let request = describe(runtime, path)?;
        let class = runtime.classifier().classify(&request);
        let response = runtime.on_fetch(&request).await;

        let source = match &response.source {
            ResponseSource::Network => "network".to_string(),
            ResponseSource::Cache(partition) => format!("cache:{}", partition),
            ResponseSource::Synthetic => "synthetic".to_string(),
        };

        ctx.output.table_row(
            &[
                path.as_str(),
                class_badge(class.name()).as_str(),
                status_badge(response.status.as_u16()).as_str(),
                source.as_str(),
                format_bytes(response.body.len() as u64).as_str(),
            ],
            &[32, 24, 14, 20, 10],
        );

        rows.push(FetchRow {
            pass,
            path: path.clone(),
            class: class.name(),
            status: response.status.as_u16(),
            source,
            bytes: response.body.len(),
        });
    }
    Ok(rows)
}

/// Describe a path the way a browser would request it.
fn describe(runtime: &OfflineRuntime, path: &str) -> Result<RequestDescriptor> {
    let url = format!("{}{}", runtime.config().origin.trim_end_matches('/'), path);
    let request = RequestDescriptor::get(&url)?;
    let lower = request.path().to_ascii_lowercase();

    let request = if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        request.with_destination(Destination::Image)
    } else if lower.ends_with('/') || lower.ends_with(".html") {
        request
            .with_mode(RequestMode::Navigate)
            .with_destination(Destination::Document)
    } else {
        request
    };
    Ok(request)
}
