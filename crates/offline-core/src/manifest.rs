//! Build-time asset manifest.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Asset manifest produced by the storefront build: `{ "files": [...] }`.
///
/// Read once during install to pre-populate the static partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    /// Static asset paths (e.g. `/assets/app.js`).
    pub files: Vec<String>,
}

impl AssetManifest {
    /// Create a manifest from a list of paths.
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a manifest from its JSON body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CoreError> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject blank entries.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(pos) = self.files.iter().position(|f| f.trim().is_empty()) {
            return Err(CoreError::InvalidManifest(format!(
                "entry {} is empty",
                pos
            )));
        }
        Ok(())
    }

    /// Paths with duplicates removed, in manifest order.
    pub fn unique_files(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.files
            .iter()
            .map(String::as_str)
            .filter(|f| seen.insert(*f))
            .collect()
    }

    /// Number of listed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manifest lists nothing.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
