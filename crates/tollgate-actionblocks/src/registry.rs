//! The name → block map and its discovery pass.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::block::{ActionBlock, BlockSource};
use crate::config::ActionBlockConfig;
use crate::validate::{ValidationReport, validate_block};

/// Project-relative directory scanned for blocks.
pub const BLOCKS_SUBDIR: &str = ".codebolt/actionblocks";

/// Directory of discovered action blocks, keyed by name.
///
/// The map is rebuilt wholesale on each discovery pass. Directories without
/// a valid config are skipped with a warning, never a hard failure.
#[derive(Debug, Default)]
pub struct ActionBlockRegistry {
    blocks: RwLock<HashMap<String, Arc<ActionBlock>>>,
}

impl ActionBlockRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry and run a project discovery pass when a project
    /// path is known.
    #[must_use]
    pub fn init(project_path: Option<&Path>) -> Self {
        let registry = Self::new();
        if let Some(project) = project_path {
            registry.discover(&project.join(BLOCKS_SUBDIR), BlockSource::Project);
        }
        registry
    }

    /// Scan `base` for immediate child directories holding a valid config,
    /// replacing the current map. Returns how many blocks were loaded.
    pub fn discover(&self, base: &Path, source: BlockSource) -> usize {
        let mut found = HashMap::new();

        let entries = match std::fs::read_dir(base) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(base = %base.display(), error = %e, "No action block directory");
                self.replace(found);
                return 0;
            },
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            match ActionBlockConfig::load(&dir) {
                Ok(config) => {
                    let block = Arc::new(ActionBlock::from_config(config, dir, source));
                    debug!(name = %block.name, path = %block.path.display(), "Action block loaded");
                    if let Some(previous) = found.insert(block.name.clone(), block) {
                        warn!(
                            name = %previous.name,
                            path = %previous.path.display(),
                            "Duplicate action block name — later directory wins"
                        );
                    }
                },
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping invalid action block");
                },
            }
        }

        let count = found.len();
        info!(base = %base.display(), count, "Action block discovery complete");
        self.replace(found);
        count
    }

    fn replace(&self, blocks: HashMap<String, Arc<ActionBlock>>) {
        match self.blocks.write() {
            Ok(mut map) => *map = blocks,
            Err(e) => warn!(error = %e, "Block map lock poisoned — discovery result dropped"),
        }
    }

    /// Look up a block by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ActionBlock>> {
        self.blocks.read().ok()?.get(name).cloned()
    }

    /// Look up a block by its directory path.
    #[must_use]
    pub fn get_by_path(&self, path: &Path) -> Option<Arc<ActionBlock>> {
        self.blocks
            .read()
            .ok()?
            .values()
            .find(|block| block.path == path)
            .cloned()
    }

    /// Every discovered block.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<ActionBlock>> {
        self.blocks
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Re-verify a block directory from scratch.
    #[must_use]
    pub fn validate(&self, path: &Path) -> ValidationReport {
        validate_block(path)
    }
}
