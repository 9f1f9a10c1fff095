//! Permission scopes: the (tool, resource, access) triple requests are
//! checked against.

use serde::{Deserialize, Serialize};
use std::fmt;

use tollgate_core::AccessKind;

/// What a tool wants to do to a resource.
///
/// Not persisted directly; grants embed the triple in a [`PermissionRule`]
/// and the grant tables are keyed by [`PermissionScope::key`].
///
/// [`PermissionRule`]: crate::rule::PermissionRule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionScope {
    /// The tool asking for access, e.g. `write_file`.
    pub tool: String,
    /// The resource being accessed, typically an absolute path.
    pub resource: String,
    /// The kind of access requested.
    pub access: AccessKind,
}

impl PermissionScope {
    /// Create a scope.
    #[must_use]
    pub fn new(tool: impl Into<String>, resource: impl Into<String>, access: AccessKind) -> Self {
        Self {
            tool: tool.into(),
            resource: resource.into(),
            access,
        }
    }

    /// The string-joined lookup key used by the grant tables.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}::{}::{}", self.tool, self.resource, self.access)
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} ({})", self.tool, self.resource, self.access)
    }
}
