//! Gateway configuration: the `tollgate.toml` document.
//!
//! A missing file is not an error; every field has a default so a bare
//! `tollgated` starts in interactive mode with the stock timers. A file
//! that exists but does not parse is a hard error, surfaced before any
//! socket is bound.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use tollgate_routing::DeploymentProfile;
use tollgate_supervisor::SupervisorTimeouts;

/// Configuration load/validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The config file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid TOML for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The config file path.
        path: String,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A field value is out of range.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong with the document.
        reason: String,
    },
}

/// Timer overrides, all in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TimeoutConfig {
    /// How long a suspended request waits for a human decision.
    #[serde(default = "default_approval_secs")]
    pub approval_secs: u64,
    /// How long a launched action block may take to register.
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// The graceful-shutdown window before a child is killed.
    #[serde(default = "default_shutdown_secs")]
    pub shutdown_secs: u64,
}

fn default_approval_secs() -> u64 {
    300
}

fn default_connect_secs() -> u64 {
    30
}

fn default_shutdown_secs() -> u64 {
    5
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            approval_secs: default_approval_secs(),
            connect_secs: default_connect_secs(),
            shutdown_secs: default_shutdown_secs(),
        }
    }
}

/// The gateway's on-disk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct GatewayConfig {
    /// Which routing table is active.
    #[serde(default = "default_profile")]
    pub profile: DeploymentProfile,
    /// Project root for per-project action block discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,
    /// Unix socket path override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Permission store path override. When unset the store lives in the
    /// tollgate data directory; `:memory:` disables persistence entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_store: Option<PathBuf>,
    /// Timer overrides.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_profile() -> DeploymentProfile {
    DeploymentProfile::Interactive
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            project_path: None,
            socket_path: None,
            permission_store: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file, treating a missing file as the defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read, does not parse, or
    /// fails [`GatewayConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject documents a running gateway could not honor.
    ///
    /// # Errors
    ///
    /// Fails when any timer is zero or a declared project path is
    /// relative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.approval_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "timeouts.approval_secs must be at least 1".into(),
            });
        }
        if self.timeouts.connect_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "timeouts.connect_secs must be at least 1".into(),
            });
        }
        if self.timeouts.shutdown_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "timeouts.shutdown_secs must be at least 1".into(),
            });
        }
        if let Some(project) = &self.project_path
            && !project.is_absolute()
        {
            return Err(ConfigError::Invalid {
                reason: format!("project_path must be absolute, got {}", project.display()),
            });
        }
        Ok(())
    }

    /// The approval wait as a [`Duration`].
    #[must_use]
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.approval_secs)
    }

    /// The supervisor's timers, with the stock cleanup grace.
    #[must_use]
    pub fn supervisor_timeouts(&self) -> SupervisorTimeouts {
        SupervisorTimeouts {
            connect: Duration::from_secs(self.timeouts.connect_secs),
            shutdown: Duration::from_secs(self.timeouts.shutdown_secs),
            ..SupervisorTimeouts::default()
        }
    }
}
