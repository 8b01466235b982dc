//! Connection registry keyed by stable connection id.
//!
//! Not internally synchronized: the router owns it inside the same lock as
//! the history buffer so a routing decision sees one consistent view.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::connection::{Connection, PeerSink, Profile, Role};
use crate::ids::ConnectionId;

/// Result of [`ConnectionRegistry::assign_role`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// Role and profile were recorded.
    Assigned,
    /// The connection already holds `0`; nothing changed.
    AlreadyRegistered(Role),
    /// No such connection (already closed).
    UnknownConnection,
}

/// Every live connection, registered or not.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection with no role.
    pub fn add(&mut self, sink: Arc<dyn PeerSink>, connected_at: i64) -> ConnectionId {
        let id = ConnectionId::new();
        let _ = self
            .connections
            .insert(id.clone(), Connection::new(id.clone(), sink, connected_at));
        debug!(conn_id = %id, total = self.connections.len(), "connection added");
        id
    }

    /// Set role and profile once. Later attempts keep the first assignment.
    pub fn assign_role(
        &mut self,
        id: &ConnectionId,
        role: Role,
        profile: Profile,
        at: i64,
    ) -> Assignment {
        let Some(conn) = self.connections.get_mut(id) else {
            return Assignment::UnknownConnection;
        };
        if let Some(existing) = conn.role() {
            return Assignment::AlreadyRegistered(existing);
        }
        conn.register(role, profile, at);
        Assignment::Assigned
    }

    /// Drop a connection. Returns `None` if it was already gone.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    /// Ids of live connections holding `role`, in no particular order.
    pub fn members_of_role(&self, role: Role) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| c.role() == Some(role))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Sinks of live connections holding `role`, paired with their ids.
    pub fn sinks_of_role(&self, role: Role) -> Vec<(ConnectionId, Arc<dyn PeerSink>)> {
        self.connections
            .values()
            .filter(|c| c.role() == Some(role))
            .map(|c| (c.id.clone(), c.sink()))
            .collect()
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Role of a connection, `None` if unknown or unregistered.
    pub fn role_of(&self, id: &ConnectionId) -> Option<Role> {
        self.connections.get(id).and_then(Connection::role)
    }

    /// Profile of a connection, `None` if unknown or unregistered.
    pub fn profile_of(&self, id: &ConnectionId) -> Option<&Profile> {
        self.connections.get(id).and_then(Connection::profile)
    }

    /// Number of live connections of `role`.
    pub fn count_role(&self, role: Role) -> usize {
        self.connections
            .values()
            .filter(|c| c.role() == Some(role))
            .count()
    }

    /// Total live connections, registered or not.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
