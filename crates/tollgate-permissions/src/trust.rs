//! Folder trust records and the ancestor-walk lookup.
//!
//! Trust is inherited from the nearest ancestor directory that has an
//! entry, and only [`TrustLevel::Full`] propagates to descendants: a
//! `limited` ancestor does **not** transitively trust children.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use tollgate_core::{Timestamp, TrustLevel};

/// A persisted folder trust decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedFolder {
    /// Absolute folder path.
    pub path: String,
    /// The granted trust level.
    pub level: TrustLevel,
    /// When trust was granted.
    pub trusted_at: Timestamp,
    /// Who granted it.
    pub trusted_by: String,
}

impl TrustedFolder {
    /// Create a trust record stamped now.
    #[must_use]
    pub fn new(path: impl Into<String>, level: TrustLevel, trusted_by: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            level,
            trusted_at: Timestamp::now(),
            trusted_by: trusted_by.into(),
        }
    }
}

/// Look up the trust level that applies to `path`.
///
/// An exact entry wins. Otherwise the nearest ancestor with an entry
/// decides: `Full` propagates down, `Limited` and `None` do not (the walk
/// stops at the first entry found either way).
#[must_use]
pub fn effective_trust(
    folders: &HashMap<String, TrustedFolder>,
    path: &Path,
) -> Option<TrustLevel> {
    let key = path.to_string_lossy();
    if let Some(entry) = folders.get(key.as_ref()) {
        return Some(entry.level);
    }

    let mut current = path;
    while let Some(parent) = current.parent() {
        let parent_key = parent.to_string_lossy();
        if let Some(entry) = folders.get(parent_key.as_ref()) {
            // Nearest ancestor decides; only full trust reaches descendants.
            return match entry.level {
                TrustLevel::Full => Some(TrustLevel::Full),
                TrustLevel::Limited | TrustLevel::None => None,
            };
        }
        current = parent;
    }
    None
}

/// Whether operations under `path` bypass per-operation approval.
#[must_use]
pub fn is_trusted(folders: &HashMap<String, TrustedFolder>, path: &Path) -> bool {
    matches!(
        effective_trust(folders, path),
        Some(TrustLevel::Full | TrustLevel::Limited)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folders(entries: &[(&str, TrustLevel)]) -> HashMap<String, TrustedFolder> {
        entries
            .iter()
            .map(|(path, level)| {
                (
                    (*path).to_string(),
                    TrustedFolder::new(*path, *level, "tester"),
                )
            })
            .collect()
    }

    #[test]
    fn test_exact_match() {
        let f = folders(&[("/a", TrustLevel::Limited)]);
        assert!(is_trusted(&f, Path::new("/a")));
        assert_eq!(
            effective_trust(&f, Path::new("/a")),
            Some(TrustLevel::Limited)
        );
    }

    #[test]
    fn test_limited_does_not_propagate() {
        let f = folders(&[("/a", TrustLevel::Limited)]);
        assert!(!is_trusted(&f, Path::new("/a/b")));
    }

    #[test]
    fn test_full_propagates() {
        let f = folders(&[("/a", TrustLevel::Full)]);
        assert!(is_trusted(&f, Path::new("/a/b")));
        assert!(is_trusted(&f, Path::new("/a/b/c/d")));
    }

    #[test]
    fn test_none_level_is_untrusted() {
        let f = folders(&[("/a", TrustLevel::None)]);
        assert!(!is_trusted(&f, Path::new("/a")));
        assert!(!is_trusted(&f, Path::new("/a/b")));
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        // /a is fully trusted but /a/b is explicitly limited: /a/b/c asks
        // its nearest decided ancestor (/a/b), which does not propagate.
        let f = folders(&[("/a", TrustLevel::Full), ("/a/b", TrustLevel::Limited)]);
        assert!(is_trusted(&f, Path::new("/a/x")));
        assert!(is_trusted(&f, Path::new("/a/b")));
        assert!(!is_trusted(&f, Path::new("/a/b/c")));
    }

    #[test]
    fn test_no_entries() {
        let f = HashMap::new();
        assert!(!is_trusted(&f, Path::new("/anywhere")));
        assert_eq!(effective_trust(&f, Path::new("/anywhere")), None);
    }
}
