//! Timeout configuration for network attempts.

use std::future::Future;
use std::time::Duration;

use crate::client::FetchError;

/// Timeout configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Duration,
    /// Total operation timeout.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create a new timeout configuration.
    pub fn new(connect: Duration, total: Duration) -> Self {
        Self { connect, total }
    }

    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: Duration::from_millis(total.as_millis() as u64 / 4),
            total,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            total: Duration::from_secs(30),
        }
    }
}

/// Run `fut`, failing with `FetchError::Timeout` once `limit` elapses.
///
/// With no limit the future runs to completion. When the limit fires the
/// future is dropped, so nothing it would have produced is observed.
pub async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => fut.await,
    }
}
