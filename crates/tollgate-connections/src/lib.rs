//! Connection registry for the Tollgate execution gateway.
//!
//! Tracks every connected peer, partitioned by role (console, application,
//! agent), and pushes frames to them. Sends are fire-and-forget: a failed
//! send is logged and reported as `false`, never an error — a peer going
//! away mid-send is an ordinary event, not a fault.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod connection;
pub mod registry;

pub use connection::{Connection, OutboundReceiver, OutboundSender, outbound_channel};
pub use registry::ConnectionRegistry;
