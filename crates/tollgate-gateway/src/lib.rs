//! The Tollgate execution gateway.
//!
//! Brokers privileged operations between console, application, and agent
//! peers over a Unix domain socket. Requests are routed per event
//! category (local or proxied), gated through the permission authority
//! with human approval on `Ask`, and executed by pluggable adapters;
//! action blocks run as supervised side executions.
//!
//! This crate is the composition layer: subsystem construction lives in
//! [`services`], per-request flow in [`dispatcher`], and the transport in
//! [`socket`]. The `tollgated` binary is a thin wrapper over these.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod services;
pub mod socket;

pub use config::{ConfigError, GatewayConfig, TimeoutConfig};
pub use dispatcher::RequestDispatcher;
pub use executor::{NullExecutor, RequestExecutor};
pub use services::Services;
pub use socket::SocketServer;
