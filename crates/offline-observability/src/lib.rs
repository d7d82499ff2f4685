//! Observability infrastructure for the offline runtime.
//!
//! This crate provides:
//! - `init_logging` - Installs the global `tracing` subscriber
//! - `request_span` - Per-request span carrying id, method and path
//! - `RuntimeMetrics` - Lock-free counters with a serializable snapshot

mod logging;
mod metrics;
mod span;

pub use logging::*;
pub use metrics::*;
pub use span::*;
