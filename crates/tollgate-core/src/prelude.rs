//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{GatewayError, GatewayResult};

// Envelope
pub use crate::{
    ClientFrame, EventCategory, Notification, RegisterInfo, RequestEnvelope, RequestPayload,
    ResponseEnvelope, ServerFrame,
};

// Ids and value types
pub use crate::{
    AccessKind, ApprovalId, ConnectionId, ConnectionRole, ExecutionId, ProjectInfo, RequestId,
    Timestamp, TrustLevel,
};
