//! Runtime configuration.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which query parameters take part in cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "params", rename_all = "snake_case")]
pub enum QueryPolicy {
    /// Drop the listed parameters, keep everything else.
    Ignore(Vec<String>),
    /// Keep only the listed parameters, drop everything else.
    KeepOnly(Vec<String>),
}

impl QueryPolicy {
    /// Whether a query parameter affects response identity.
    pub fn is_identity(&self, name: &str) -> bool {
        match self {
            Self::Ignore(params) => !params.iter().any(|p| p == name),
            Self::KeepOnly(params) => params.iter().any(|p| p == name),
        }
    }
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self::Ignore(vec!["v".to_string()])
    }
}

/// Image served when an image can be fetched neither from cache nor network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderImage {
    /// MIME type of the image.
    pub content_type: String,
    /// Base64 encoded image bytes.
    pub data: String,
}

impl PlaceholderImage {
    /// Decode the image bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, CoreError> {
        STANDARD
            .decode(self.data.trim())
            .map_err(|e| CoreError::InvalidConfig(format!("placeholder_image.data: {e}")))
    }
}

impl Default for PlaceholderImage {
    fn default() -> Self {
        // 1x1 transparent GIF
        Self {
            content_type: "image/gif".to_string(),
            data: "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7".to_string(),
        }
    }
}

/// Immutable configuration of one runtime instance.
///
/// Fixed at build/deploy time; nothing here changes while the runtime runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Origin the runtime serves (scheme, host, port).
    pub origin: String,
    /// Build generation tag appended to every partition name.
    pub generation: String,
    /// Path of the asset manifest fetched on install.
    pub manifest_path: String,
    /// Path of the interception script itself.
    pub script_path: String,
    /// Path prefixes that are never cached or served from cache.
    pub denylist: Vec<String>,
    /// Path prefixes of bundled scripts, styles and the web manifest.
    pub static_prefixes: Vec<String>,
    /// Path of the product data file.
    pub data_endpoint: String,
    /// Query parameter policy for cache keys.
    pub query: QueryPolicy,
    /// Network timeout for page navigations.
    pub navigation_timeout_ms: u64,
    /// Network timeout for the product data endpoint.
    pub data_timeout_ms: u64,
    /// Network timeout for each image attempt.
    pub image_timeout_ms: u64,
    /// Network timeout for the manifest and each precached asset.
    pub install_timeout_ms: u64,
    /// Cached documents tried, in order, when a navigation fails.
    pub shell_paths: Vec<String>,
    /// HTML served when a navigation has no network and no cached shell.
    pub offline_page: String,
    /// Image served when an image request cannot be answered.
    pub placeholder_image: PlaceholderImage,
    /// Extra network attempts for images before the placeholder is used.
    pub image_retries: u32,
    /// Annotate cached-strategy responses with `X-Cache-*` headers.
    pub explain_headers: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            generation: "v6".to_string(),
            manifest_path: "/asset-manifest.json".to_string(),
            script_path: "/sw.js".to_string(),
            denylist: vec![
                "/admin".to_string(),
                "/api/internal".to_string(),
                "/sw.js".to_string(),
            ],
            static_prefixes: vec![
                "/assets/".to_string(),
                "/js/".to_string(),
                "/css/".to_string(),
                "/manifest.json".to_string(),
                "/manifest.webmanifest".to_string(),
            ],
            data_endpoint: "/data/product_data.json".to_string(),
            query: QueryPolicy::default(),
            navigation_timeout_ms: 3000,
            data_timeout_ms: 4000,
            image_timeout_ms: 5000,
            install_timeout_ms: 10000,
            shell_paths: vec!["/index.html".to_string(), "/".to_string()],
            offline_page: default_offline_page(),
            placeholder_image: PlaceholderImage::default(),
            image_retries: 1,
            explain_headers: false,
        }
    }
}

impl RuntimeConfig {
    /// Create a config for an origin with all other fields defaulted.
    pub fn for_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Default::default()
        }
    }

    /// Set the generation tag.
    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = generation.into();
        self
    }

    /// Navigation network timeout.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Data endpoint network timeout.
    pub fn data_timeout(&self) -> Duration {
        Duration::from_millis(self.data_timeout_ms)
    }

    /// Timeout of a single image attempt.
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    /// Install-time network timeout.
    pub fn install_timeout(&self) -> Duration {
        Duration::from_millis(self.install_timeout_ms)
    }

    /// Check the configuration for values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        url::Url::parse(&self.origin)
            .map_err(|e| CoreError::InvalidConfig(format!("origin: {e}")))?;

        if self.generation.trim().is_empty() {
            return Err(CoreError::InvalidConfig("generation is empty".to_string()));
        }
        if self.generation.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidConfig(format!(
                "generation '{}' contains whitespace",
                self.generation
            )));
        }

        let paths = std::iter::once(("manifest_path", &self.manifest_path))
            .chain(std::iter::once(("script_path", &self.script_path)))
            .chain(std::iter::once(("data_endpoint", &self.data_endpoint)))
            .chain(self.denylist.iter().map(|p| ("denylist", p)))
            .chain(self.static_prefixes.iter().map(|p| ("static_prefixes", p)))
            .chain(self.shell_paths.iter().map(|p| ("shell_paths", p)));
        for (field, path) in paths {
            if !path.starts_with('/') {
                return Err(CoreError::InvalidConfig(format!(
                    "{field}: '{path}' is not an absolute path"
                )));
            }
        }

        let timeouts = [
            self.navigation_timeout_ms,
            self.data_timeout_ms,
            self.image_timeout_ms,
            self.install_timeout_ms,
        ];
        if timeouts.contains(&0) {
            return Err(CoreError::InvalidConfig("timeouts must be non-zero".to_string()));
        }

        self.placeholder_image.bytes()?;
        Ok(())
    }
}

fn default_offline_page() -> String {
    r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Offline</title></head>
<body>
<h1>You are offline</h1>
<p>The store could not be reached. Check your connection and try again.</p>
</body>
</html>
"#
    .to_string()
}
