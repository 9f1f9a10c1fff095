//! The role-partitioned connection directory.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use tollgate_core::{ConnectionId, ConnectionRole, ServerFrame};

use crate::connection::Connection;

/// Directory of every connected peer, partitioned by role.
///
/// Role partitions keep role-scoped queries (all applications, any console)
/// proportional to the partition, not the whole registry. All sends are
/// fire-and-forget: failure is logged and reported as `false`.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    consoles: DashMap<ConnectionId, Arc<Connection>>,
    applications: DashMap<ConnectionId, Arc<Connection>>,
    agents: DashMap<ConnectionId, Arc<Connection>>,
}

impl ConnectionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, role: ConnectionRole) -> &DashMap<ConnectionId, Arc<Connection>> {
        match role {
            ConnectionRole::Console => &self.consoles,
            ConnectionRole::Application => &self.applications,
            ConnectionRole::Agent => &self.agents,
        }
    }

    /// Insert a connection into its role partition.
    pub fn register(&self, connection: Connection) -> Arc<Connection> {
        let connection = Arc::new(connection);
        info!(
            id = %connection.id,
            role = %connection.role,
            thread_id = ?connection.thread_id,
            "Connection registered"
        );
        self.partition(connection.role)
            .insert(connection.id, Arc::clone(&connection));
        connection
    }

    /// Remove a connection, returning it if it was present.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        for role in [
            ConnectionRole::Console,
            ConnectionRole::Application,
            ConnectionRole::Agent,
        ] {
            if let Some((_, connection)) = self.partition(role).remove(&id) {
                info!(%id, %role, "Connection removed");
                return Some(connection);
            }
        }
        None
    }

    /// Look up a connection by id across all partitions.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.consoles
            .get(&id)
            .or_else(|| self.applications.get(&id))
            .or_else(|| self.agents.get(&id))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Every connection, across all roles.
    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<Connection>> {
        self.consoles
            .iter()
            .chain(self.applications.iter())
            .chain(self.agents.iter())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Every connection of one role.
    #[must_use]
    pub fn all_of_role(&self, role: ConnectionRole) -> Vec<Arc<Connection>> {
        self.partition(role)
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Total connection count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.consoles
            .len()
            .saturating_add(self.applications.len())
            .saturating_add(self.agents.len())
    }

    /// Whether no peer is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize a frame and push it to one peer.
    ///
    /// Returns `false` when the peer is unknown, the frame does not
    /// serialize, or the peer's transport is gone. Failures are logged,
    /// never raised.
    #[must_use]
    pub fn send(&self, id: ConnectionId, frame: &ServerFrame) -> bool {
        let Some(connection) = self.get(id) else {
            warn!(%id, "Send to unknown connection dropped");
            return false;
        };
        let bytes = match serde_json::to_vec(frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%id, error = %e, "Failed to serialize outbound frame");
                return false;
            },
        };
        let delivered = connection.push(bytes);
        if delivered {
            debug!(%id, "Frame queued");
        } else {
            warn!(%id, "Transport gone — frame dropped");
        }
        delivered
    }

    /// Push a frame to every peer of one role, continuing past failures.
    ///
    /// Returns how many peers the frame was queued for.
    pub fn broadcast(&self, role: ConnectionRole, frame: &ServerFrame) -> usize {
        let bytes = match serde_json::to_vec(frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%role, error = %e, "Failed to serialize broadcast frame");
                return 0;
            },
        };
        let mut delivered = 0usize;
        for entry in self.partition(role).iter() {
            if entry.value().push(bytes.clone()) {
                delivered = delivered.saturating_add(1);
            } else {
                warn!(id = %entry.value().id, %role, "Broadcast skipped dead transport");
            }
        }
        delivered
    }

    /// Resolve who should approve on behalf of an agent connection.
    ///
    /// The agent's parent application wins when it is still connected;
    /// otherwise any console. `None` means standalone/headless operation
    /// with no human approver attached.
    #[must_use]
    pub fn approval_target(&self, agent: &Connection) -> Option<Arc<Connection>> {
        if let Some(parent_id) = agent.parent_id
            && let Some(parent) = self.applications.get(&parent_id)
        {
            return Some(Arc::clone(parent.value()));
        }
        self.consoles
            .iter()
            .next()
            .map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::outbound_channel;
    use tollgate_core::{Notification, RegisterInfo};

    fn connect(
        registry: &ConnectionRegistry,
        role: ConnectionRole,
    ) -> (Arc<Connection>, crate::connection::OutboundReceiver) {
        let (tx, rx) = outbound_channel();
        let connection = Connection::from_register(
            RegisterInfo {
                role,
                project: None,
                thread_id: None,
                instance_id: None,
                parent_instance_id: None,
                parent_id: None,
            },
            tx,
        );
        (registry.register(connection), rx)
    }

    fn resolved_frame() -> ServerFrame {
        ServerFrame::Notification(Notification::ApprovalResolved {
            message_id: tollgate_core::ApprovalId::new(),
            approved: true,
            reason: None,
        })
    }

    #[test]
    fn test_register_get_remove() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = connect(&registry, ConnectionRole::Agent);

        assert_eq!(registry.len(), 1);
        assert!(registry.get(conn.id).is_some());

        let removed = registry.remove(conn.id).unwrap();
        assert_eq!(removed.id, conn.id);
        assert!(registry.get(conn.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_role_partitions() {
        let registry = ConnectionRegistry::new();
        let _keep = [
            connect(&registry, ConnectionRole::Console),
            connect(&registry, ConnectionRole::Application),
            connect(&registry, ConnectionRole::Application),
            connect(&registry, ConnectionRole::Agent),
        ];

        assert_eq!(registry.all_of_role(ConnectionRole::Console).len(), 1);
        assert_eq!(registry.all_of_role(ConnectionRole::Application).len(), 2);
        assert_eq!(registry.all_of_role(ConnectionRole::Agent).len(), 1);
        assert_eq!(registry.get_all().len(), 4);
    }

    #[test]
    fn test_send_reaches_peer() {
        let registry = ConnectionRegistry::new();
        let (conn, mut rx) = connect(&registry, ConnectionRole::Application);

        assert!(registry.send(conn.id, &resolved_frame()));
        let bytes = rx.try_recv().unwrap();
        let frame: ServerFrame = serde_json::from_slice(&bytes).unwrap();
        assert!(matches!(frame, ServerFrame::Notification(_)));
    }

    #[test]
    fn test_send_to_unknown_peer_is_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send(ConnectionId::new(), &resolved_frame()));
    }

    #[test]
    fn test_send_after_disconnect_is_false() {
        let registry = ConnectionRegistry::new();
        let (conn, rx) = connect(&registry, ConnectionRole::Console);
        drop(rx);
        assert!(!registry.send(conn.id, &resolved_frame()));
    }

    #[test]
    fn test_broadcast_continues_past_dead_transport() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = connect(&registry, ConnectionRole::Application);
        let (_dead, dead_rx) = connect(&registry, ConnectionRole::Application);
        let (_b, mut rx_b) = connect(&registry, ConnectionRole::Application);
        drop(dead_rx);

        let delivered = registry.broadcast(ConnectionRole::Application, &resolved_frame());
        assert_eq!(delivered, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_is_role_scoped() {
        let registry = ConnectionRegistry::new();
        let (_console, mut console_rx) = connect(&registry, ConnectionRole::Console);
        let (_agent, mut agent_rx) = connect(&registry, ConnectionRole::Agent);

        registry.broadcast(ConnectionRole::Console, &resolved_frame());
        assert!(console_rx.try_recv().is_ok());
        assert!(agent_rx.try_recv().is_err());
    }

    #[test]
    fn test_approval_target_prefers_parent_application() {
        let registry = ConnectionRegistry::new();
        let (app, _app_rx) = connect(&registry, ConnectionRole::Application);
        let (_console, _console_rx) = connect(&registry, ConnectionRole::Console);

        let (tx, _rx) = outbound_channel();
        let agent = registry.register(Connection::from_register(
            RegisterInfo {
                role: ConnectionRole::Agent,
                project: None,
                thread_id: Some("thread-1".into()),
                instance_id: None,
                parent_instance_id: None,
                parent_id: Some(app.id),
            },
            tx,
        ));

        let target = registry.approval_target(&agent).unwrap();
        assert_eq!(target.id, app.id);
    }

    #[test]
    fn test_approval_target_falls_back_to_console() {
        let registry = ConnectionRegistry::new();
        let (console, _console_rx) = connect(&registry, ConnectionRole::Console);
        let (agent, _agent_rx) = connect(&registry, ConnectionRole::Agent);

        let target = registry.approval_target(&agent).unwrap();
        assert_eq!(target.id, console.id);
    }

    #[test]
    fn test_no_approval_target_when_standalone() {
        let registry = ConnectionRegistry::new();
        let (agent, _rx) = connect(&registry, ConnectionRole::Agent);
        assert!(registry.approval_target(&agent).is_none());
    }
}
