//! Runtime errors.

use offline_cache::CacheError;
use offline_core::{CoreError, LifecycleState};

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by lifecycle events.
///
/// Fetch handling never fails; these only come out of install, activate
/// and construction.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("manifest fetch failed: {0}")]
    ManifestFetch(String),

    #[error("failed to fetch asset {path}: {reason}")]
    AssetFetch { path: String, reason: String },

    #[error("cannot move from {from} to {to}")]
    Lifecycle {
        from: LifecycleState,
        to: LifecycleState,
    },
}
