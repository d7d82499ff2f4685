//! Offline caching runtime.
//!
//! This crate ties the pieces together:
//! - `RequestClassifier` - Assigns each request a routing class
//! - `StrategyEngine` - Runs the caching strategy of that class
//! - `FallbackResponses` - Synthetic last-resort responses
//! - `ControlMessage` / `ControlReply` - Out-of-band control channel
//! - `OfflineRuntime` - Install, activate, fetch and message handling

mod classifier;
mod control;
mod engine;
mod error;
mod fallback;
mod runtime;

pub use classifier::*;
pub use control::*;
pub use engine::*;
pub use error::*;
pub use fallback::*;
pub use runtime::*;
