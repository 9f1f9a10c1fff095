//! Durable permission storage: one JSON document, written wholesale.
//!
//! The document has three top-level maps (granted permissions, trusted
//! folders, policies) plus a `lastSaved` stamp. Load is best-effort: a
//! missing or corrupt file yields an empty document, never a startup
//! failure. Every mutating call on the authority rewrites the whole file;
//! concurrent external edits are not reconciled (last writer wins).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use tollgate_core::Timestamp;

use crate::error::{PermissionError, PermissionResult};
use crate::policy::PermissionPolicy;
use crate::rule::PermissionRule;
use crate::trust::TrustedFolder;

/// The persisted permission document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDocument {
    /// Scope key → granted rule.
    #[serde(default)]
    pub granted_permissions: HashMap<String, PermissionRule>,
    /// Folder path → trust record.
    #[serde(default)]
    pub trusted_folders: HashMap<String, TrustedFolder>,
    /// Policy name → policy.
    #[serde(default)]
    pub policies: HashMap<String, PermissionPolicy>,
    /// When the document was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<Timestamp>,
}

/// File-backed store for the permission document.
#[derive(Debug, Clone)]
pub struct PermissionStore {
    path: PathBuf,
}

impl PermissionStore {
    /// Create a store at `path`. Nothing is read or written until
    /// [`load`](Self::load) / [`save`](Self::save).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, degrading to empty on any failure.
    #[must_use]
    pub fn load(&self) -> PermissionDocument {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(doc) => {
                    debug!(path = %self.path.display(), "Loaded permission store");
                    doc
                },
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Corrupt permission store — starting with empty state"
                    );
                    PermissionDocument::default()
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PermissionDocument::default(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Unreadable permission store — starting with empty state"
                );
                PermissionDocument::default()
            },
        }
    }

    /// Write the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the filesystem write fails.
    pub fn save(&self, doc: &mut PermissionDocument) -> PermissionResult<()> {
        doc.last_saved = Some(Timestamp::now());
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| PermissionError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PermissionError::Storage(e.to_string()))?;
        }
        std::fs::write(&self.path, bytes).map_err(|e| PermissionError::Storage(e.to_string()))?;
        debug!(path = %self.path.display(), "Saved permission store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::PermissionScope;
    use tollgate_core::{AccessKind, TrustLevel};

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PermissionStore::new(dir.path().join("permissions.json"));
        let doc = store.load();
        assert!(doc.granted_permissions.is_empty());
        assert!(doc.trusted_folders.is_empty());
        assert!(doc.policies.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        std::fs::write(&path, b"{not json at all").unwrap();
        let doc = PermissionStore::new(&path).load();
        assert!(doc.granted_permissions.is_empty());
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("permissions.json");
        let store = PermissionStore::new(&path);

        let scope = PermissionScope::new("write_file", "/tmp/x.txt", AccessKind::Write);
        let mut doc = PermissionDocument::default();
        doc.granted_permissions
            .insert(scope.key(), PermissionRule::allow(&scope));
        doc.trusted_folders.insert(
            "/home/user/project".into(),
            TrustedFolder::new("/home/user/project", TrustLevel::Full, "user"),
        );
        store.save(&mut doc).unwrap();
        assert!(doc.last_saved.is_some());

        let reloaded = store.load();
        assert_eq!(reloaded.granted_permissions.len(), 1);
        assert!(reloaded.granted_permissions.contains_key(&scope.key()));
        assert_eq!(reloaded.trusted_folders.len(), 1);
        assert_eq!(reloaded.last_saved, doc.last_saved);
    }

    #[test]
    fn test_document_wire_shape() {
        let doc = PermissionDocument {
            last_saved: Some(Timestamp::now()),
            ..PermissionDocument::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("grantedPermissions").is_some());
        assert!(value.get("trustedFolders").is_some());
        assert!(value.get("policies").is_some());
        assert!(value.get("lastSaved").is_some());
    }
}
