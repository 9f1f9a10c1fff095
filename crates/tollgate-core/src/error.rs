//! The gateway-wide error taxonomy.
//!
//! Every failure a public gateway method can produce maps onto one of these
//! variants. Local component failures are converted to structured results at
//! each public boundary; nothing propagates as an unhandled fault past the
//! connection send path.

use thiserror::Error;

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// A requested action block or connection target does not exist.
    /// Reported immediately, never retried.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Malformed or incomplete configuration or request data.
    #[error("validation failed: {reason}")]
    Validation {
        /// Why validation failed.
        reason: String,
    },

    /// A handshake or shutdown exceeded its bound; the affected operation
    /// was forced into a terminal state.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The bound that was exceeded.
        seconds: u64,
    },

    /// A human or policy declined the request. A normal failure response,
    /// distinguishable from system errors.
    #[error("rejected: {reason}")]
    Rejected {
        /// The rejection reason, surfaced to the requester.
        reason: String,
    },

    /// Send to a disconnected peer. Logged and swallowed at the registry
    /// boundary; surfaced only where a response path genuinely needs it.
    #[error("transport error: {0}")]
    Transport(String),

    /// Permission-file read/write failure. Load failures degrade to empty
    /// state; write failures leave the in-memory grant valid for the session.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl GatewayError {
    /// Shorthand for a [`GatewayError::NotFound`].
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for a [`GatewayError::Validation`].
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`GatewayError::Rejected`].
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether this is a rejection (human or policy), as opposed to a
    /// system error.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = GatewayError::not_found("action block 'lint'");
        assert_eq!(e.to_string(), "not found: action block 'lint'");

        let e = GatewayError::Timeout {
            operation: "connection handshake".into(),
            seconds: 30,
        };
        assert_eq!(e.to_string(), "connection handshake timed out after 30s");
    }

    #[test]
    fn test_rejection_is_distinguishable() {
        assert!(GatewayError::rejected("nope").is_rejection());
        assert!(!GatewayError::Transport("peer gone".into()).is_rejection());
    }
}
