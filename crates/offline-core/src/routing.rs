//! Routing classes.

use serde::{Deserialize, Serialize};

/// The category an intercepted request is assigned to.
///
/// Every request maps to exactly one class; the class decides the caching
/// strategy applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingClass {
    /// Bundled scripts, styles and the web manifest.
    StaticAsset,
    /// Top-level HTML page loads.
    Navigation,
    /// The product data file.
    DataEndpoint,
    /// Product and UI images.
    Image,
    /// Never cached, always sent to the network.
    Bypass,
}

impl RoutingClass {
    /// Stable name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticAsset => "static-asset",
            Self::Navigation => "navigation",
            Self::DataEndpoint => "data-endpoint",
            Self::Image => "image",
            Self::Bypass => "bypass",
        }
    }
}

impl std::fmt::Display for RoutingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
