//! Side execution supervisor for the Tollgate gateway.
//!
//! Launches action blocks as isolated child processes, runs the
//! registration handshake with each child, enforces connect and shutdown
//! timeouts, and guarantees cleanup on success, failure, or forced stop.
//!
//! # Design
//!
//! Process launching sits behind the [`ProcessLauncher`] trait, so the
//! supervisor's state machine is exercised in tests without forking a
//! single OS process. Each live execution is driven by one monitor task
//! that owns the child's message channel; completion is signaled through a
//! oneshot resolved exactly once, whether the child reports an explicit
//! result or simply exits.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod execution;
pub mod launcher;
pub mod message;
pub mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use execution::{CompletionResult, ExecutionSnapshot, ExecutionStatus};
pub use launcher::{ChildChannel, LaunchSpec, ProcessLauncher, TokioLauncher};
pub use message::{ChildEvent, ChildMessage, SupervisorMessage};
pub use supervisor::{SideExecutionSupervisor, SupervisorTimeouts};
