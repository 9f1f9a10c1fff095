//! Permission authority for the Tollgate execution gateway.
//!
//! Evaluates and persists capability grants (tool × resource × access kind),
//! folder trust levels, and named policies with priority-ordered rules.
//!
//! # Evaluation Order
//!
//! 1. Session grants (in-memory, cleared when the process exits)
//! 2. Persistent grants (flushed to the store on every mutation)
//! 3. Policy evaluation across all enabled policies
//!
//! The first valid (non-expired) hit wins. No match anywhere yields
//! [`Decision::Ask`] — the authority fails closed.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod authority;
pub mod error;
pub mod policy;
pub mod rule;
pub mod scope;
pub mod store;
pub mod trust;

pub use authority::PermissionAuthority;
pub use error::{PermissionError, PermissionResult};
pub use policy::{PermissionPolicy, default_policies};
pub use rule::{Decision, PermissionRule};
pub use scope::PermissionScope;
pub use store::{PermissionDocument, PermissionStore};
pub use trust::TrustedFolder;
