//! Tollgate Core - Foundation types for the Tollgate execution gateway.
//!
//! This crate provides:
//! - Id newtypes and timestamps shared across the gateway
//! - The wire envelope: closed, tagged message unions for every frame a
//!   peer can send or receive
//! - The gateway-wide error taxonomy
//! - Per-user data directory resolution

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod dirs;
pub mod envelope;
pub mod error;
pub mod prelude;
pub mod types;

pub use envelope::{
    ClientFrame, EventCategory, Notification, RegisterInfo, RequestEnvelope, RequestPayload,
    ResponseEnvelope, ServerFrame,
};
pub use error::{GatewayError, GatewayResult};
pub use types::{
    AccessKind, ApprovalId, ConnectionId, ConnectionRole, ExecutionId, ProjectInfo, RequestId,
    Timestamp, TrustLevel,
};
