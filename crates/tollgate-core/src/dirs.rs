//! Per-user data directory for the gateway.
//!
//! Holds everything the gateway persists between runs:
//!
//! ```text
//! <data dir>/                     (TollgateHome)
//! ├── permissions.json            (grants, trusted folders, policies)
//! └── tollgate.toml               (gateway config)
//! ```
//!
//! The data dir resolves to `$TOLLGATE_HOME` when set, otherwise the
//! platform application-data directory for "tollgate".

use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// The gateway's per-user data directory.
#[derive(Debug, Clone)]
pub struct TollgateHome {
    root: PathBuf,
}

impl TollgateHome {
    /// Resolve the data directory.
    ///
    /// Checks `$TOLLGATE_HOME` first, then falls back to the platform
    /// application-data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `$TOLLGATE_HOME` is set but not absolute, or if
    /// no platform data directory can be determined.
    pub fn resolve() -> io::Result<Self> {
        if let Ok(custom) = std::env::var("TOLLGATE_HOME") {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "TOLLGATE_HOME must be an absolute path",
                ));
            }
            return Ok(Self { root: p });
        }

        let dirs = ProjectDirs::from("", "", "tollgate").ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "no home directory available for this user",
            )
        })?;
        Ok(Self {
            root: dirs.data_dir().to_path_buf(),
        })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory exists with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.root, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the permission store document.
    #[must_use]
    pub fn permission_store_path(&self) -> PathBuf {
        self.root.join("permissions.json")
    }

    /// Path to the gateway configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("tollgate.toml")
    }
}
