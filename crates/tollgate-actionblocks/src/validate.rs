//! Standalone block validation, run before any process is forked.

use std::path::Path;

use crate::block::entry_point_is_contained;
use crate::config::{ActionBlockConfig, CONFIG_FILE};

/// Result of validating one block directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Whether the block may be executed.
    pub valid: bool,
    /// Problems that block execution.
    pub errors: Vec<String>,
    /// Problems worth surfacing that do not block execution.
    pub warnings: Vec<String>,
}

/// Re-verify a block directory from scratch: config presence, required
/// fields, and that the resolved entry point file exists.
///
/// The supervisor runs this before forking, so a broken block never costs
/// an OS process.
#[must_use]
pub fn validate_block(dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !dir.is_dir() {
        report
            .errors
            .push(format!("block directory does not exist: {}", dir.display()));
        return report;
    }

    let config = match ActionBlockConfig::load(dir) {
        Ok(config) => config,
        Err(e) => {
            report.errors.push(format!("{CONFIG_FILE}: {e}"));
            return report;
        },
    };

    if config.name.trim().is_empty() {
        report.errors.push("name must not be empty".to_string());
    }
    if config.description.trim().is_empty() {
        report
            .warnings
            .push("description is empty".to_string());
    }

    if entry_point_is_contained(&config.entry_point) {
        let entry = dir.join(&config.entry_point);
        if !entry.is_file() {
            report
                .errors
                .push(format!("entry point not found: {}", entry.display()));
        }
    } else {
        report.errors.push(format!(
            "entry point escapes the block directory: {}",
            config.entry_point
        ));
    }

    report.valid = report.errors.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn block_dir(dir: &Path, name: &str, yaml: &str, entry: Option<&str>) -> std::path::PathBuf {
        let block = dir.join(name);
        fs::create_dir_all(&block).unwrap();
        fs::write(block.join(CONFIG_FILE), yaml).unwrap();
        if let Some(entry) = entry {
            let entry = block.join(entry);
            fs::create_dir_all(entry.parent().unwrap()).unwrap();
            fs::write(entry, "// entry").unwrap();
        }
        block
    }

    #[test]
    fn test_valid_block() {
        let dir = tempfile::tempdir().unwrap();
        let block = block_dir(
            dir.path(),
            "ok",
            "name: ok\ndescription: fine\n",
            Some("dist/index.js"),
        );
        let report = validate_block(&block);
        assert!(report.valid, "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let report = validate_block(Path::new("/nonexistent/block"));
        assert!(!report.valid);
        assert!(report.errors[0].contains("does not exist"));
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_block(dir.path());
        assert!(!report.valid);
        assert!(report.errors[0].contains(CONFIG_FILE));
    }

    #[test]
    fn test_missing_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let block = block_dir(dir.path(), "broken", "name: broken\n", None);
        let report = validate_block(&block);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("entry point not found")));
    }

    #[test]
    fn test_empty_description_is_a_warning_only() {
        let dir = tempfile::tempdir().unwrap();
        let block = block_dir(dir.path(), "terse", "name: terse\n", Some("dist/index.js"));
        let report = validate_block(&block);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_escaping_entry_point_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let block = block_dir(
            dir.path(),
            "sneaky",
            "name: sneaky\nentryPoint: ../../outside.js\n",
            None,
        );
        let report = validate_block(&block);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("escapes")));
    }
}
