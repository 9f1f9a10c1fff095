//! Common identifier and value types used throughout the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declare a Uuid-backed id newtype with a display prefix.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a peer connection.
    ConnectionId,
    "conn"
);
uuid_id!(
    /// Unique identifier for a single request envelope.
    RequestId,
    "req"
);
uuid_id!(
    /// Correlation id for a pending approval (distinct from the request id).
    ApprovalId,
    "appr"
);
uuid_id!(
    /// Unique identifier for one running side execution.
    ExecutionId,
    "exec"
);

/// A UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Check whether this timestamp lies in the future.
    #[must_use]
    pub fn is_future(&self) -> bool {
        self.0 > Utc::now()
    }

    /// Check whether this timestamp lies in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// The role a peer declared at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionRole {
    /// Interactive console front end.
    Console,
    /// Application/UI client that can spawn and observe agents.
    Application,
    /// Autonomous agent worker.
    Agent,
}

impl ConnectionRole {
    /// Stable string form, used in logs and wire frames.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Application => "application",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The project a connection is currently operating on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Absolute project path.
    pub path: String,
    /// Human-readable project name.
    pub name: String,
}

/// The kind of access a tool requests on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    /// Read-only access.
    Read,
    /// Mutating access.
    Write,
    /// Process or command execution.
    Execute,
    /// All of the above.
    All,
}

impl AccessKind {
    /// Whether a grant of `self` covers a request for `other`.
    ///
    /// `All` covers everything; otherwise the kinds must match exactly.
    #[must_use]
    pub fn covers(self, other: Self) -> bool {
        self == Self::All || self == other
    }

    /// Stable string form, used in scope keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
            Self::All => "all",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much a trusted folder is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Fully trusted; trust propagates to descendant directories.
    Full,
    /// Trusted for this exact folder only; does **not** propagate.
    Limited,
    /// Explicitly untrusted.
    None,
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Limited => f.write_str("limited"),
            Self::None => f.write_str("none"),
        }
    }
}
