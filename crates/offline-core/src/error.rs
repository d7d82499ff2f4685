//! Core error types.

/// Errors raised while building requests, parsing manifests or validating
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid asset manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
