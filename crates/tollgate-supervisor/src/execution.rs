//! Per-execution state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use tollgate_core::{ExecutionId, Timestamp};

/// State machine of one side execution.
///
/// `Starting -> Running -> {Completed | Failed}`, with `Stopping` preceding
/// a forced termination. Terminal entries are removed from the live map
/// after a short cleanup grace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Launched, handshake not yet received.
    Starting,
    /// Handshake received; the block is doing work.
    Running,
    /// A stop was requested; graceful-shutdown window is open.
    Stopping,
    /// Terminal: completed successfully.
    Completed,
    /// Terminal: failed, crashed, or was stopped.
    Failed,
}

impl ExecutionStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Running => f.write_str("running"),
            Self::Stopping => f.write_str("stopping"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// How an execution finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Whether the block succeeded.
    pub success: bool,
    /// Result payload from an explicit completion message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error description, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionResult {
    /// A success carrying an optional result payload.
    #[must_use]
    pub fn success(result: Option<Value>) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    /// A failure with a reason.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Synthesize a result from a bare process exit.
    ///
    /// Exit code 0 is implicit success; anything else is a failure.
    #[must_use]
    pub fn from_exit(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::success(None),
            Some(code) => Self::failure(format!("process exited with code {code}")),
            None => Self::failure("process terminated by signal"),
        }
    }
}

/// Read-only snapshot of a live execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSnapshot {
    /// The execution id.
    pub execution_id: ExecutionId,
    /// Block name.
    pub name: String,
    /// Originating action block id.
    pub block_id: String,
    /// Owning thread id.
    pub thread_id: String,
    /// Current state.
    pub status: ExecutionStatus,
    /// When the launch was requested.
    pub started_at: Timestamp,
}
