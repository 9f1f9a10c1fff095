//! The declarative `actionblock.yml` config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Config file name inside each block directory.
pub const CONFIG_FILE: &str = "actionblock.yml";

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_entry_point() -> String {
    "dist/index.js".to_string()
}

/// Parsed contents of an `actionblock.yml`.
///
/// Only `name` is required; everything else has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBlockConfig {
    /// Block name, unique within a discovery pass.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Semantic version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Entry point, relative to the block directory.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_yaml::Value>,
}

impl ActionBlockConfig {
    /// Load the config from a block directory.
    ///
    /// # Errors
    ///
    /// Returns the underlying message when the file is missing, unreadable,
    /// or not valid YAML.
    pub fn load(block_dir: &Path) -> Result<Self, String> {
        let path = block_dir.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        serde_yaml::from_str(&raw).map_err(|e| format!("invalid {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config: ActionBlockConfig = serde_yaml::from_str("name: greeter").unwrap();
        assert_eq!(config.name, "greeter");
        assert_eq!(config.description, "");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.entry_point, "dist/index.js");
        assert!(config.metadata.is_empty());
    }

    #[test]
    fn test_full_config() {
        let yaml = r"
name: formatter
description: Formats source files
version: 2.1.0
entryPoint: build/main.js
metadata:
  author: dev-team
";
        let config: ActionBlockConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, "2.1.0");
        assert_eq!(config.entry_point, "build/main.js");
        assert_eq!(
            config.metadata.get("author"),
            Some(&serde_yaml::Value::String("dev-team".into()))
        );
    }

    #[test]
    fn test_name_is_required() {
        assert!(serde_yaml::from_str::<ActionBlockConfig>("version: 1.0.0").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ActionBlockConfig::load(dir.path()).unwrap_err();
        assert!(err.contains("cannot read"));
    }
}
