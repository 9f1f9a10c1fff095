//! Structured messages exchanged with child processes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tollgate_core::ExecutionId;

/// Messages a child may send to the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChildMessage {
    /// The registration handshake; must arrive within the connect timeout.
    Register {
        /// The execution id the child was launched with.
        execution_id: ExecutionId,
    },
    /// Explicit completion with a result or error.
    Complete {
        /// The reporting execution.
        execution_id: ExecutionId,
        /// Whether the block succeeded.
        success: bool,
        /// Result payload, on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error description, on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Messages the supervisor sends to a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SupervisorMessage {
    /// Invocation parameters and thread context, sent after the handshake.
    Start {
        /// Arbitrary invocation params.
        params: Value,
        /// Snapshot of the owning thread's context.
        thread_context: Value,
    },
    /// Graceful termination request.
    Shutdown,
}

/// Events surfaced by a launched child's channel.
#[derive(Debug)]
pub enum ChildEvent {
    /// A structured message arrived from the child.
    Message(ChildMessage),
    /// The child process exited.
    Exited {
        /// Exit code, when the OS reported one.
        code: Option<i32>,
    },
    /// The process channel failed.
    Fault(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_wire_shape() {
        let id = ExecutionId::new();
        let msg = ChildMessage::Register { execution_id: id };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "register");
        assert!(value.get("executionId").is_some());
    }

    #[test]
    fn test_complete_omits_empty_fields() {
        let msg = ChildMessage::Complete {
            execution_id: ExecutionId::new(),
            success: true,
            result: None,
            error: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("result").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_supervisor_message_roundtrip() {
        let msg = SupervisorMessage::Start {
            params: serde_json::json!({"input": 1}),
            thread_context: serde_json::json!({}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: SupervisorMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
