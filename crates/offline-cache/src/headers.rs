//! Cache debugging headers.

use offline_core::CapturedResponse;
use serde::{Deserialize, Serialize};

use crate::key::CacheKey;
use crate::store::CacheStatus;

/// Header names for cache debugging.
pub mod header_names {
    /// Cache status header (HIT, MISS, STALE, OFFLINE).
    pub const X_CACHE_STATUS: &str = "X-Cache-Status";
    /// Cache key used for lookup.
    pub const X_CACHE_KEY: &str = "X-Cache-Key";
    /// Partition the response was read from or written to.
    pub const X_CACHE_PARTITION: &str = "X-Cache-Partition";
    /// Age of the cached entry in seconds.
    pub const X_CACHE_AGE: &str = "X-Cache-Age";
}

/// Cache explain headers for debugging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Overall cache status.
    pub status: Option<CacheStatus>,
    /// Cache key used.
    pub cache_key: Option<String>,
    /// Partition involved.
    pub partition: Option<String>,
    /// Age of cached response in seconds.
    pub age_secs: Option<u64>,
}

impl CacheExplainHeaders {
    /// Create new explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache status.
    pub fn with_status(mut self, status: CacheStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set cache key.
    pub fn with_key(mut self, key: &CacheKey) -> Self {
        self.cache_key = Some(key.as_str().to_string());
        self
    }

    /// Write the headers onto a response.
    pub fn apply(&self, response: &mut CapturedResponse) {
        if let Some(status) = self.status {
            response.set_header(header_names::X_CACHE_STATUS, &status.to_string());
        }
        if let Some(key) = &self.cache_key {
            response.set_header(header_names::X_CACHE_KEY, key);
        }
        if let Some(partition) = &self.partition {
            response.set_header(header_names::X_CACHE_PARTITION, partition);
        }
        if let Some(age) = self.age_secs {
            response.set_header(header_names::X_CACHE_AGE, &age.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_headers() {
        let mut response = CapturedResponse::ok("body");
        let explain = CacheExplainHeaders {
            age_secs: Some(12),
            ..CacheExplainHeaders::new()
        };
        explain
            .with_status(CacheStatus::Hit)
            .with_key(&CacheKey::new("/a.js"))
            .apply(&mut response);

        assert_eq!(response.header("x-cache-status"), Some("HIT"));
        assert_eq!(response.header("x-cache-key"), Some("/a.js"));
        assert_eq!(response.header("x-cache-age"), Some("12"));
        assert_eq!(response.header("x-cache-partition"), None);
    }
}
