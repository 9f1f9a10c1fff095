//! One connected peer and its outbound channel.

use tokio::sync::mpsc;

use tollgate_core::{ConnectionId, ConnectionRole, ProjectInfo, RegisterInfo, Timestamp};

/// Sending half of a connection's outbound frame channel.
///
/// The transport loop owns the receiving half and writes each frame to the
/// peer's stream in order, so per-connection delivery order follows send
/// order.
pub type OutboundSender = mpsc::UnboundedSender<Vec<u8>>;

/// Receiving half of a connection's outbound frame channel.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

/// Create the outbound channel for a new connection.
#[must_use]
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// One peer connection, held by the registry for its lifetime.
///
/// Created on handshake, removed on disconnect.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection id.
    pub id: ConnectionId,
    /// Declared role.
    pub role: ConnectionRole,
    /// Current project, when the peer declared one.
    pub project: Option<ProjectInfo>,
    /// Owning thread id, for agent workers.
    pub thread_id: Option<String>,
    /// Agent instance id.
    pub instance_id: Option<String>,
    /// Parent agent instance id.
    pub parent_instance_id: Option<String>,
    /// The application connection that spawned this agent.
    pub parent_id: Option<ConnectionId>,
    /// When the peer registered.
    pub connected_at: Timestamp,
    /// Serialized frames queued for the peer's transport.
    outbound: OutboundSender,
}

impl Connection {
    /// Build a connection from a registration handshake.
    #[must_use]
    pub fn from_register(info: RegisterInfo, outbound: OutboundSender) -> Self {
        Self {
            id: ConnectionId::new(),
            role: info.role,
            project: info.project,
            thread_id: info.thread_id,
            instance_id: info.instance_id,
            parent_instance_id: info.parent_instance_id,
            parent_id: info.parent_id,
            connected_at: Timestamp::now(),
            outbound,
        }
    }

    /// Queue already-serialized bytes for the peer. Returns whether the
    /// transport side is still attached.
    pub(crate) fn push(&self, bytes: Vec<u8>) -> bool {
        self.outbound.send(bytes).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: ConnectionRole) -> RegisterInfo {
        RegisterInfo {
            role,
            project: None,
            thread_id: None,
            instance_id: None,
            parent_instance_id: None,
            parent_id: None,
        }
    }

    #[test]
    fn test_push_delivers_in_order() {
        let (tx, mut rx) = outbound_channel();
        let conn = Connection::from_register(register(ConnectionRole::Agent), tx);

        assert!(conn.push(b"one".to_vec()));
        assert!(conn.push(b"two".to_vec()));
        assert_eq!(rx.try_recv().unwrap(), b"one");
        assert_eq!(rx.try_recv().unwrap(), b"two");
    }

    #[test]
    fn test_push_fails_after_transport_drop() {
        let (tx, rx) = outbound_channel();
        let conn = Connection::from_register(register(ConnectionRole::Console), tx);
        drop(rx);
        assert!(!conn.push(b"late".to_vec()));
    }
}
