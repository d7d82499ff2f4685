//! Partition naming.

use serde::{Deserialize, Serialize};

/// The fixed set of logical cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalPartition {
    /// Bundled assets warmed on install.
    Static,
    /// Product data.
    Data,
    /// Images.
    Images,
    /// Pages cached while browsing.
    Runtime,
}

impl LogicalPartition {
    /// Every logical partition.
    pub const ALL: [LogicalPartition; 4] = [Self::Static, Self::Data, Self::Images, Self::Runtime];

    /// Logical name as it appears in the partition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Data => "data",
            Self::Images => "images",
            Self::Runtime => "runtime",
        }
    }

    /// Parse a logical name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for LogicalPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete partition: logical name plus generation tag (`static-v6`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionName {
    /// Logical partition.
    pub logical: LogicalPartition,
    /// Build generation tag.
    pub generation: String,
}

impl PartitionName {
    /// Create a partition name.
    pub fn new(logical: LogicalPartition, generation: impl Into<String>) -> Self {
        Self {
            logical,
            generation: generation.into(),
        }
    }

    /// Parse a stored partition name.
    ///
    /// Returns `None` for names outside the `<logical>-<generation>` layout,
    /// e.g. partitions left behind by older builds with a different scheme.
    pub fn parse(name: &str) -> Option<Self> {
        let (logical, generation) = name.split_once('-')?;
        if generation.is_empty() {
            return None;
        }
        Some(Self::new(LogicalPartition::parse(logical)?, generation))
    }

    /// Full stored name.
    pub fn as_string(&self) -> String {
        format!("{}-{}", self.logical, self.generation)
    }
}

impl std::fmt::Display for PartitionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.logical, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_name_round_trip() {
        let name = PartitionName::new(LogicalPartition::Static, "v6");
        assert_eq!(name.as_string(), "static-v6");
        assert_eq!(PartitionName::parse("static-v6"), Some(name));
    }

    #[test]
    fn test_generation_may_contain_dash() {
        let name = PartitionName::parse("images-v7-beta").unwrap();
        assert_eq!(name.logical, LogicalPartition::Images);
        assert_eq!(name.generation, "v7-beta");
    }

    #[test]
    fn test_legacy_names_do_not_parse() {
        assert!(PartitionName::parse("storefront-cache").is_none());
        assert!(PartitionName::parse("static").is_none());
        assert!(PartitionName::parse("static-").is_none());
        assert!(PartitionName::parse("workbox-precache-v2").is_none());
    }
}
