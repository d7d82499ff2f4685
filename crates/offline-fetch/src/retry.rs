//! Bounded retries with exponential backoff.

use std::time::Duration;

use crate::client::FetchError;

/// How many extra attempts to make and how long to wait between them.
///
/// `max_retries` counts attempts after the first one, so a policy is always
/// bounded. The delay doubles per attempt and is capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }

    /// A single attempt.
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Retry a `5xx` while attempts remain.
    pub fn should_retry_status(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_retries && (500..600).contains(&status)
    }

    /// Retry timeouts and connection failures while attempts remain.
    pub fn should_retry_error(&self, error: &FetchError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
