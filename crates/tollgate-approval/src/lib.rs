//! Human approval workflow for the Tollgate execution gateway.
//!
//! When the permission authority answers `Ask`, the request is suspended
//! here: a correlation id is minted, the owning application (or a console)
//! is notified, and the requesting task parks on a oneshot waiter until a
//! decision arrives, the approval times out, or no approver exists at all.
//!
//! # Completion paths
//!
//! Two independent paths resolve a pending approval and both must be
//! supported: a free-text confirmation (only the literal, case-insensitive
//! `"approve"` proceeds) and a structured state notification (`"approved"`
//! proceeds). Whichever arrives first wins; the pending entry is removed
//! exactly once in every path.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod outcome;
pub mod workflow;

pub use outcome::ApprovalOutcome;
pub use workflow::{ApprovalWorkflow, DEFAULT_APPROVAL_TIMEOUT};
