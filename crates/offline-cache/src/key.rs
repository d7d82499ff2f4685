//! Cache key normalization.

use offline_core::QueryPolicy;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// A normalized cache key uniquely identifying a cached response.
///
/// Same-origin requests are keyed by path and identity query
/// (`/data/product_data.json`), cross-origin requests keep their origin
/// (`https://cdn.example/img/a.png`) so the two can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// The computed key string.
    key: String,
    /// Components that make up the key (for debugging).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<String>,
}

impl CacheKey {
    /// Create a cache key from a string, bypassing normalization.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            components: Vec::new(),
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Get the key components (for debugging).
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Derives cache keys from request URLs.
///
/// Query parameters that do not affect response identity (per the
/// configured `QueryPolicy`) are dropped, the rest are sorted so parameter
/// order does not split the cache. Fragments never take part in a key.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    origin: Url,
    query: QueryPolicy,
}

impl KeyNormalizer {
    /// Create a normalizer for the runtime's origin.
    pub fn new(origin: Url, query: QueryPolicy) -> Self {
        Self { origin, query }
    }

    /// The origin same-origin keys are relative to.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Normalize an absolute URL.
    pub fn normalize(&self, url: &Url) -> CacheKey {
        let mut components = Vec::new();
        let mut key = String::new();

        if url.origin() == self.origin.origin() {
            components.push("origin:same".to_string());
        } else {
            let origin = url.origin().ascii_serialization();
            components.push(format!("origin:{}", origin));
            key.push_str(&origin);
        }

        key.push_str(url.path());
        components.push(format!("path:{}", url.path()));

        let mut kept: Vec<(String, String)> = Vec::new();
        for (name, value) in url.query_pairs() {
            if self.query.is_identity(&name) {
                kept.push((name.into_owned(), value.into_owned()));
            } else {
                components.push(format!("dropped:{}", name));
            }
        }
        kept.sort();

        if !kept.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (name, value) in &kept {
                serializer.append_pair(name, value);
                components.push(format!("query:{}={}", name, value));
            }
            key.push('?');
            key.push_str(&serializer.finish());
        }

        CacheKey { key, components }
    }

    /// Normalize a path (with optional query) relative to the origin.
    ///
    /// Returns `None` when the path cannot be joined onto the origin.
    pub fn normalize_path(&self, path: &str) -> Option<CacheKey> {
        self.origin.join(path).ok().map(|url| self.normalize(&url))
    }
}
