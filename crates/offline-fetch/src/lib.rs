//! Network access layer with timeouts and bounded retries.
//!
//! This crate provides:
//! - `Network` - The seam every network attempt goes through
//! - `HttpNetwork` - A reqwest-backed `Network`
//! - `FetchPolicy` / `fetch_with_policy` - Per-attempt timeout plus retries
//! - `TimeoutConfig` - Client timeouts
//! - `RetryPolicy` - Retry strategies

mod client;
mod retry;
mod timeout;

pub use client::*;
pub use retry::*;
pub use timeout::*;
