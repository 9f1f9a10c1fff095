//! A discovered action block.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ActionBlockConfig;

/// Where a block was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
    /// Shipped with the gateway.
    Builtin,
    /// From the per-user global directory.
    Global,
    /// From the current project's `.codebolt/actionblocks`.
    Project,
}

impl fmt::Display for BlockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("builtin"),
            Self::Global => f.write_str("global"),
            Self::Project => f.write_str("project"),
        }
    }
}

/// One discovered, filesystem-backed action block.
///
/// Immutable once loaded; the registry map is rebuilt wholesale on each
/// discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBlock {
    /// Block id; currently the block's name.
    pub id: String,
    /// Block name from the config.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Semantic version.
    pub version: String,
    /// Entry point relative to the block directory.
    pub entry_point: String,
    /// Absolute block directory.
    pub path: PathBuf,
    /// Discovery source.
    pub source: BlockSource,
    /// Free-form metadata from the config.
    pub metadata: HashMap<String, serde_yaml::Value>,
}

impl ActionBlock {
    /// Build a block from a loaded config and its directory.
    #[must_use]
    pub fn from_config(config: ActionBlockConfig, dir: PathBuf, source: BlockSource) -> Self {
        Self {
            id: config.name.clone(),
            name: config.name,
            description: config.description,
            version: config.version,
            entry_point: config.entry_point,
            path: dir,
            source,
            metadata: config.metadata,
        }
    }

    /// Block kind; every block is filesystem-backed today.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        "actionblock"
    }

    /// Absolute path of the entry point file.
    #[must_use]
    pub fn entry_point_path(&self) -> PathBuf {
        self.path.join(&self.entry_point)
    }

    /// Whether the entry point file exists on disk.
    #[must_use]
    pub fn has_entry_point(&self) -> bool {
        self.entry_point_path().is_file()
    }
}

/// Guard against entry points escaping the block directory.
pub(crate) fn entry_point_is_contained(entry_point: &str) -> bool {
    let path = Path::new(entry_point);
    !path.is_absolute()
        && !path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> ActionBlockConfig {
        serde_yaml::from_str(&format!("name: {name}")).unwrap()
    }

    #[test]
    fn test_from_config() {
        let block = ActionBlock::from_config(
            config("greeter"),
            PathBuf::from("/proj/.codebolt/actionblocks/greeter"),
            BlockSource::Project,
        );
        assert_eq!(block.id, "greeter");
        assert_eq!(block.kind(), "actionblock");
        assert_eq!(
            block.entry_point_path(),
            PathBuf::from("/proj/.codebolt/actionblocks/greeter/dist/index.js")
        );
    }

    #[test]
    fn test_entry_point_containment() {
        assert!(entry_point_is_contained("dist/index.js"));
        assert!(entry_point_is_contained("main.js"));
        assert!(!entry_point_is_contained("../outside.js"));
        assert!(!entry_point_is_contained("/etc/passwd"));
        assert!(!entry_point_is_contained("dist/../../outside.js"));
    }
}
