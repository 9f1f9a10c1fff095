//! Supervisor errors.

use thiserror::Error;
use tollgate_core::ExecutionId;

/// Result alias for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors from side execution management.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The block directory failed validation before launch.
    #[error("action block not runnable at {path}: {reasons}")]
    InvalidBlock {
        /// The block directory that was requested.
        path: String,
        /// Joined validation errors.
        reasons: String,
    },

    /// The child process could not be spawned.
    #[error("failed to launch child process: {0}")]
    Launch(String),

    /// The child never completed the registration handshake.
    #[error("execution {id} did not register within {seconds}s")]
    HandshakeTimeout {
        /// The execution that was force-stopped.
        id: ExecutionId,
        /// The connect timeout that expired.
        seconds: u64,
    },

    /// The child exited before completing the handshake.
    #[error("execution {id} exited before registering (code {code:?})")]
    ExitedBeforeHandshake {
        /// The execution that died early.
        id: ExecutionId,
        /// The exit code, when the OS reported one.
        code: Option<i32>,
    },

    /// No live execution with this id.
    #[error("unknown execution: {0}")]
    UnknownExecution(ExecutionId),

    /// `wait_for_completion` was already called for this execution.
    #[error("completion of {0} is already being awaited")]
    AlreadyAwaited(ExecutionId),

    /// The monitor task went away without resolving completion.
    #[error("execution {0} channel closed without a result")]
    ChannelClosed(ExecutionId),
}
