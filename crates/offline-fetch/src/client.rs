//! Network access for the offline runtime.

use std::time::Duration;

use async_trait::async_trait;
use offline_core::{CapturedResponse, RequestDescriptor};

use crate::retry::RetryPolicy;
use crate::timeout::{with_timeout, TimeoutConfig};

/// Error type for network attempts.
///
/// HTTP error statuses are not errors here: a `404` is a response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("body error: {0}")]
    Body(String),
}

impl FetchError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

/// Something that can turn a request into a fully buffered response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send the request unmodified and buffer the response.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, FetchError>;
}

/// Fetch policy combining an attempt timeout and a retry policy.
#[derive(Debug, Clone, Default)]
pub struct FetchPolicy {
    /// Bound on each individual attempt.
    pub timeout: Option<Duration>,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl FetchPolicy {
    /// Create a new fetch policy.
    pub fn new(timeout: Option<Duration>, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Single attempt bounded by `timeout`.
    pub fn bounded(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            retry: RetryPolicy::none(),
        }
    }
}

/// Fetch through `network` applying the policy's timeout and retries.
///
/// Returns the last response when a retryable status persists, or the last
/// error when every attempt failed.
pub async fn fetch_with_policy(
    network: &dyn Network,
    request: &RequestDescriptor,
    policy: &FetchPolicy,
) -> Result<CapturedResponse, FetchError> {
    let mut attempt = 0;
    loop {
        match with_timeout(policy.timeout, network.fetch(request)).await {
            Ok(response) => {
                if policy.retry.should_retry_status(response.status.as_u16(), attempt) {
                    tracing::debug!(url = %request.url, status = %response.status, attempt, "retrying status");
                } else {
                    return Ok(response);
                }
            }
            Err(e) => {
                if !policy.retry.should_retry_error(&e, attempt) {
                    return Err(e);
                }
                tracing::debug!(url = %request.url, error = %e, attempt, "retrying error");
            }
        }
        tokio::time::sleep(policy.retry.delay_for(attempt)).await;
        attempt += 1;
    }
}

/// `Network` backed by a real HTTP client.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    /// Create a client with the given timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.total)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, FetchError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        let mut captured = CapturedResponse::new(status, body);
        captured.headers = headers;
        Ok(captured)
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(Duration::ZERO)
    } else if e.is_connect() {
        FetchError::Connection(e.to_string())
    } else {
        FetchError::Request(e.to_string())
    }
}
