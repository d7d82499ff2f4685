//! Per-class caching policies.

use std::time::Duration;

use offline_core::{RoutingClass, RuntimeConfig};
use serde::{Deserialize, Serialize};

use crate::partition::LogicalPartition;

/// How a request reaches a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Serve from cache; only hit the network on a miss.
    CacheFirst,
    /// Try the network first; fall back to cache on failure or timeout.
    NetworkFirst,
    /// Always the network, never cached.
    NetworkOnly,
}

/// What to serve when neither network nor cache can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastResort {
    /// Synthetic `504 Gateway Timeout`.
    GatewayTimeout,
    /// Cached page shell, then the offline page.
    OfflinePage,
    /// Synthetic `503` JSON error body.
    OfflineJson,
    /// Bundled placeholder image.
    PlaceholderImage,
    /// Synthetic `502 Bad Gateway`.
    BadGateway,
}

/// Caching policy applied to one routing class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPolicy {
    /// Strategy.
    pub strategy: StrategyKind,
    /// Partition reads and writes go to (`None` for bypass).
    pub partition: Option<LogicalPartition>,
    /// Bound on a single network attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Extra network attempts after the first one fails.
    pub retries: u32,
    /// Response used when everything else fails.
    pub last_resort: LastResort,
}

impl ClassPolicy {
    /// Policy for a routing class under the given configuration.
    pub fn for_class(class: RoutingClass, config: &RuntimeConfig) -> Self {
        match class {
            RoutingClass::StaticAsset => Self {
                strategy: StrategyKind::CacheFirst,
                partition: Some(LogicalPartition::Static),
                timeout: None,
                retries: 0,
                last_resort: LastResort::GatewayTimeout,
            },
            RoutingClass::Navigation => Self {
                strategy: StrategyKind::NetworkFirst,
                partition: Some(LogicalPartition::Runtime),
                timeout: Some(config.navigation_timeout()),
                retries: 0,
                last_resort: LastResort::OfflinePage,
            },
            RoutingClass::DataEndpoint => Self {
                strategy: StrategyKind::NetworkFirst,
                partition: Some(LogicalPartition::Data),
                timeout: Some(config.data_timeout()),
                retries: 0,
                last_resort: LastResort::OfflineJson,
            },
            RoutingClass::Image => Self {
                strategy: StrategyKind::CacheFirst,
                partition: Some(LogicalPartition::Images),
                timeout: Some(config.image_timeout()),
                retries: config.image_retries,
                last_resort: LastResort::PlaceholderImage,
            },
            RoutingClass::Bypass => Self {
                strategy: StrategyKind::NetworkOnly,
                partition: None,
                timeout: None,
                retries: 0,
                last_resort: LastResort::BadGateway,
            },
        }
    }

    /// Whether responses under this policy are ever written.
    pub fn writes_cache(&self) -> bool {
        self.partition.is_some() && self.strategy != StrategyKind::NetworkOnly
    }
}
