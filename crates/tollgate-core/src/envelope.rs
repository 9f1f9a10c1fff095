//! The gateway wire envelope.
//!
//! Every frame a peer can send or receive is a variant of a closed, tagged
//! union, validated at the transport boundary. Routing and handling are
//! exhaustive pattern matches; there are no free-form `type`/`action`
//! string pairs past deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::{
    ApprovalId, ConnectionId, ConnectionRole, ExecutionId, ProjectInfo, RequestId,
};

// ---------------------------------------------------------------------------
// Event categories
// ---------------------------------------------------------------------------

/// The category of a request, used by the proxy routing tables.
///
/// The set is closed: adding a category means adding a variant here and one
/// row per routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    /// File reads, writes, deletes, listings.
    FsEvent,
    /// Git operations.
    GitEvent,
    /// Browser automation.
    BrowserEvent,
    /// Terminal command execution.
    TerminalEvent,
    /// LLM inference.
    LlmEvent,
    /// Task CRUD.
    TaskEvent,
    /// Job state. Always proxied; jobs require durable external storage.
    JobEvent,
    /// Hook registration and firing.
    HookEvent,
    /// User-facing notifications.
    NotificationEvent,
    /// Chat history access.
    HistoryEvent,
    /// Code map queries.
    CodemapEvent,
    /// Agent memory store.
    MemoryEvent,
    /// Vector database queries.
    VectordbEvent,
    /// Web crawling.
    CrawlerEvent,
    /// Debugger operations.
    DebugEvent,
    /// Tokenizer utilities.
    TokenizerEvent,
    /// Chat messages between peers.
    ChatEvent,
    /// Shared state access.
    StateEvent,
    /// Project metadata.
    ProjectEvent,
    /// Raw message passing.
    MessageEvent,
    /// Agent lifecycle operations.
    AgentEvent,
    /// Tool discovery and invocation.
    ToolEvent,
    /// Orchestrator CRUD.
    OrchestratorEvent,
    /// Side execution lifecycle (action blocks).
    SideExecutionEvent,
    /// Application-level events.
    AppEvent,
}

impl EventCategory {
    /// All categories, in table order.
    pub const ALL: [Self; 25] = [
        Self::FsEvent,
        Self::GitEvent,
        Self::BrowserEvent,
        Self::TerminalEvent,
        Self::LlmEvent,
        Self::TaskEvent,
        Self::JobEvent,
        Self::HookEvent,
        Self::NotificationEvent,
        Self::HistoryEvent,
        Self::CodemapEvent,
        Self::MemoryEvent,
        Self::VectordbEvent,
        Self::CrawlerEvent,
        Self::DebugEvent,
        Self::TokenizerEvent,
        Self::ChatEvent,
        Self::StateEvent,
        Self::ProjectEvent,
        Self::MessageEvent,
        Self::AgentEvent,
        Self::ToolEvent,
        Self::OrchestratorEvent,
        Self::SideExecutionEvent,
        Self::AppEvent,
    ];
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the serde camelCase name.
        let s = serde_json::to_string(self).unwrap_or_default();
        f.write_str(s.trim_matches('"'))
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The operation an agent is asking the gateway to broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestPayload {
    /// Read a file.
    ReadFile {
        /// Absolute path to read.
        path: String,
    },
    /// Write (create or overwrite) a file.
    WriteFile {
        /// Absolute path to write.
        path: String,
        /// New file contents.
        content: String,
    },
    /// Delete a file.
    DeleteFile {
        /// Absolute path to delete.
        path: String,
    },
    /// Run a shell command.
    ExecuteCommand {
        /// The command binary.
        command: String,
        /// Command arguments.
        args: Vec<String>,
    },
    /// Run a git subcommand in the project.
    Git {
        /// Git arguments, e.g. `["status", "--short"]`.
        args: Vec<String>,
    },
    /// Run LLM inference.
    Inference {
        /// The prompt to complete.
        prompt: String,
    },
    /// List discovered action blocks.
    ListActionBlocks,
    /// Launch an action block as an isolated side execution.
    StartActionBlock {
        /// Logical block name, as discovered from its config.
        name: String,
        /// Owning thread id.
        thread_id: String,
        /// Arbitrary invocation params forwarded to the child.
        params: Value,
    },
    /// Stop a running side execution.
    StopSideExecution {
        /// The execution to stop.
        execution_id: ExecutionId,
    },
    /// Fetch durable job state. Never resolved locally.
    JobState {
        /// Opaque job id.
        job_id: String,
    },
}

impl RequestPayload {
    /// The routing category of this payload.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        match self {
            Self::ReadFile { .. } | Self::WriteFile { .. } | Self::DeleteFile { .. } => {
                EventCategory::FsEvent
            },
            Self::ExecuteCommand { .. } => EventCategory::TerminalEvent,
            Self::Git { .. } => EventCategory::GitEvent,
            Self::Inference { .. } => EventCategory::LlmEvent,
            Self::ListActionBlocks | Self::StartActionBlock { .. }
            | Self::StopSideExecution { .. } => EventCategory::SideExecutionEvent,
            Self::JobState { .. } => EventCategory::JobEvent,
        }
    }

    /// A short operation name for logs and error messages.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "read_file",
            Self::WriteFile { .. } => "write_file",
            Self::DeleteFile { .. } => "delete_file",
            Self::ExecuteCommand { .. } => "execute_command",
            Self::Git { .. } => "git",
            Self::Inference { .. } => "inference",
            Self::ListActionBlocks => "list_action_blocks",
            Self::StartActionBlock { .. } => "start_action_block",
            Self::StopSideExecution { .. } => "stop_side_execution",
            Self::JobState { .. } => "job_state",
        }
    }
}

/// A request frame: a payload plus its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation id echoed back on the response.
    pub request_id: RequestId,
    /// The requested operation.
    pub payload: RequestPayload,
}

impl RequestEnvelope {
    /// Wrap a payload in a fresh envelope.
    #[must_use]
    pub fn new(payload: RequestPayload) -> Self {
        Self {
            request_id: RequestId::new(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A response frame. Every request, including every failure path, produces
/// exactly one of these for the original requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation id of the request this answers.
    pub request_id: RequestId,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Result data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error description on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// A successful response carrying `data`.
    #[must_use]
    pub fn ok(request_id: RequestId, data: Value) -> Self {
        Self {
            request_id,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failure response carrying an error description.
    #[must_use]
    pub fn err(request_id: RequestId, error: impl Into<String>) -> Self {
        Self {
            request_id,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Push notifications the gateway sends to observing peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// A human decision is needed for a suspended request.
    ApprovalRequested {
        /// Correlation id the decision must carry.
        message_id: ApprovalId,
        /// Tool asking for access.
        tool: String,
        /// Resource being accessed.
        resource: String,
        /// The connection whose request is suspended.
        origin: ConnectionId,
    },
    /// A pending approval was decided.
    ApprovalResolved {
        /// Correlation id of the resolved approval.
        message_id: ApprovalId,
        /// Whether the request was approved.
        approved: bool,
        /// Rejection reason, when not approved.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A side execution reached a terminal state.
    ExecutionFinished {
        /// The finished execution.
        execution_id: ExecutionId,
        /// Whether it completed successfully.
        success: bool,
        /// The payload the execution completed with, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Registration data a peer sends as its first frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterInfo {
    /// Declared role.
    pub role: ConnectionRole,
    /// Current project, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectInfo>,
    /// Owning thread id, for agent workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Agent instance id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Parent agent instance id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<String>,
    /// The application connection that spawned this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ConnectionId>,
}

/// Every frame a connected peer may send to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Connection handshake; must be the first frame.
    Register(RegisterInfo),
    /// A brokered operation request.
    Request(RequestEnvelope),
    /// Direct approval confirmation with a free-text decision.
    ///
    /// Only the literal, case-insensitive value `"approve"` proceeds.
    Confirmation {
        /// Correlation id from the `ApprovalRequested` notification.
        message_id: ApprovalId,
        /// The user's free-text decision.
        user_message: String,
    },
    /// Remote structured approval notification.
    ApprovalState {
        /// Correlation id from the `ApprovalRequested` notification.
        message_id: ApprovalId,
        /// `"approved"` proceeds; anything else rejects.
        state: String,
    },
}

/// Every frame the gateway may push to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Handshake acknowledgment carrying the assigned connection id.
    Registered {
        /// The id this peer is known by for the connection's lifetime.
        connection_id: ConnectionId,
    },
    /// Response to a request this peer originated.
    Response(ResponseEnvelope),
    /// Broadcast or targeted notification.
    Notification(Notification),
    /// A request forwarded to this peer for proxy execution.
    Forward {
        /// The connection the forwarded request originated from.
        origin: ConnectionId,
        /// The request being forwarded.
        envelope: RequestEnvelope,
    },
}
