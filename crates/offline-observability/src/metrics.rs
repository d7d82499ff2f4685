//! Runtime counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters shared by the runtime and its strategy engine.
#[derive(Debug, Default)]
pub struct RuntimeMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    network_fetches: AtomicU64,
    network_failures: AtomicU64,
    fallbacks: AtomicU64,
    placeholders: AtomicU64,
    bypasses: AtomicU64,
    write_failures: AtomicU64,
    evicted: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time copy of `RuntimeMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub network_fetches: u64,
    pub network_failures: u64,
    pub fallbacks: u64,
    pub placeholders: u64,
    pub bypasses: u64,
    pub write_failures: u64,
    pub evicted: u64,
    pub invalidations: u64,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_fetch(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_failure(&self) {
        self.network_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A cached copy or synthetic response stood in for the network.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_placeholder(&self) {
        self.placeholders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            placeholders: self.placeholders.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Hits over hits plus misses, or `None` before any lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push("Cache:".to_string());
        lines.push(format!("  hits: {}", self.hits));
        lines.push(format!("  misses: {}", self.misses));
        if let Some(ratio) = self.hit_ratio() {
            lines.push(format!("  hit ratio: {:.1}%", ratio * 100.0));
        }
        lines.push(format!("  write failures: {}", self.write_failures));

        lines.push("Network:".to_string());
        lines.push(format!("  fetches: {}", self.network_fetches));
        lines.push(format!("  failures: {}", self.network_failures));
        lines.push(format!("  bypasses: {}", self.bypasses));

        lines.push("Fallbacks:".to_string());
        lines.push(format!("  served: {}", self.fallbacks));
        lines.push(format!("  placeholders: {}", self.placeholders));

        lines.push("Partitions:".to_string());
        lines.push(format!("  evicted: {}", self.evicted));
        lines.push(format!("  invalidations: {}", self.invalidations));

        lines.join("\n")
    }
}
