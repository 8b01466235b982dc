//! Role-based routing of inbound frames.
//!
//! The registry and history share one mutex. Every decision (who sent it,
//! what role they hold, which peers receive it, what gets recorded) is made
//! under a single acquisition; frames are pushed to sinks after the lock is
//! released. Sinks never block, so a slow peer cannot stall the fan-out.

use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connection::{Connection, PeerSink, Profile, Role};
use crate::errors::RelayError;
use crate::history::{HistoryBuffer, HistoryEntry};
use crate::ids::ConnectionId;
use crate::protocol::{Command, OutboundFrame};
use crate::registry::{Assignment, ConnectionRegistry};

/// Current time in ms since epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// State guarded by the router's lock.
struct RelayState {
    registry: ConnectionRegistry,
    history: HistoryBuffer,
}

/// What a successfully routed frame did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    /// The sender now holds `role`.
    Registered {
        /// Role assigned.
        role: Role,
        /// Display name from the profile.
        name: String,
    },
    /// A data message was recorded and fanned out.
    Broadcast {
        /// The recorded entry.
        entry: HistoryEntry,
        /// Role the entry was sent to.
        target: Role,
        /// Members of the target role at routing time.
        recipients: usize,
        /// How many of them accepted the frame.
        delivered: usize,
    },
}

/// Live counters for the health endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// All live connections, registered or not.
    pub connections: usize,
    /// Connections registered as remote.
    pub remotes: usize,
    /// Connections registered as robot.
    pub robots: usize,
    /// Entries currently held for replay.
    pub history_len: usize,
}

/// Decides state changes and fan-out for every inbound frame.
pub struct MessageRouter {
    state: Mutex<RelayState>,
}

impl MessageRouter {
    /// Create a router whose history keeps `history_capacity` entries.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            state: Mutex::new(RelayState {
                registry: ConnectionRegistry::new(),
                history: HistoryBuffer::new(history_capacity),
            }),
        }
    }

    /// Track a new connection and take the history snapshot it should see.
    pub fn connect(&self, sink: Arc<dyn PeerSink>, now: i64) -> (ConnectionId, Vec<HistoryEntry>) {
        let mut state = self.state.lock();
        let id = state.registry.add(sink, now);
        let snapshot = state.history.snapshot();
        gauge!("relay_connections").set(state.registry.len() as f64);
        (id, snapshot)
    }

    /// Forget a connection. Repeated calls are no-ops.
    pub fn disconnect(&self, id: &ConnectionId) -> Option<Connection> {
        let mut state = self.state.lock();
        let removed = state.registry.remove(id);
        gauge!("relay_connections").set(state.registry.len() as f64);
        removed
    }

    /// Decode and route an inbound text frame received now.
    pub fn route(&self, sender: &ConnectionId, text: &str) -> Result<Routed, RelayError> {
        self.route_at(sender, text, now_millis())
    }

    /// Decode and route an inbound text frame received at `now`.
    pub fn route_at(
        &self,
        sender: &ConnectionId,
        text: &str,
        now: i64,
    ) -> Result<Routed, RelayError> {
        match Command::decode(text)? {
            Command::RegisterRemote(profile) => self.register(sender, Role::Remote, profile, now),
            Command::RegisterRobot(profile) => self.register(sender, Role::Robot, profile, now),
            Command::Data(body) => self.broadcast(sender, body, now),
        }
    }

    fn register(
        &self,
        sender: &ConnectionId,
        role: Role,
        profile: Profile,
        now: i64,
    ) -> Result<Routed, RelayError> {
        let name = profile.name.clone();
        let kind = profile.kind.clone();
        let outcome = self
            .state
            .lock()
            .registry
            .assign_role(sender, role, profile, now);

        match outcome {
            Assignment::Assigned => {
                info!(conn_id = %sender, %role, name = %name, kind = %kind, "peer registered");
                Ok(Routed::Registered { role, name })
            }
            Assignment::AlreadyRegistered(existing) => Err(RelayError::AlreadyRegistered {
                id: sender.clone(),
                role: existing,
            }),
            Assignment::UnknownConnection => Err(RelayError::UnknownConnection(sender.clone())),
        }
    }

    fn broadcast(
        &self,
        sender: &ConnectionId,
        text: String,
        now: i64,
    ) -> Result<Routed, RelayError> {
        let (entry, target, sinks) = {
            let mut state = self.state.lock();
            let conn = state
                .registry
                .get(sender)
                .ok_or_else(|| RelayError::UnknownConnection(sender.clone()))?;
            let (Some(role), Some(profile)) = (conn.role(), conn.profile()) else {
                return Err(RelayError::UnregisteredSender(sender.clone()));
            };

            let entry = HistoryEntry {
                time: now,
                author: profile.name.clone(),
                text,
            };
            let target = role.opposite();
            let sinks = state.registry.sinks_of_role(target);
            state.history.append(entry.clone());
            (entry, target, sinks)
        };
        counter!("relay_messages_total").increment(1);

        let frame = match OutboundFrame::Command(&entry).encode() {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(conn_id = %sender, error = %e, "failed to encode command frame");
                return Ok(Routed::Broadcast {
                    entry,
                    target,
                    recipients: sinks.len(),
                    delivered: 0,
                });
            }
        };

        let mut delivered = 0;
        for (peer_id, sink) in &sinks {
            if sink.send(Arc::clone(&frame)) {
                delivered += 1;
            } else {
                counter!("relay_broadcast_drops_total").increment(1);
                warn!(conn_id = %peer_id, from = %sender, "failed to deliver command to peer");
            }
        }
        debug!(
            conn_id = %sender,
            author = %entry.author,
            %target,
            recipients = sinks.len(),
            delivered,
            "broadcast command"
        );

        Ok(Routed::Broadcast {
            entry,
            target,
            recipients: sinks.len(),
            delivered,
        })
    }

    /// Outbound sink of a live connection.
    pub fn sink_of(&self, id: &ConnectionId) -> Option<Arc<dyn PeerSink>> {
        self.state.lock().registry.get(id).map(Connection::sink)
    }

    /// Role of a live connection.
    pub fn role_of(&self, id: &ConnectionId) -> Option<Role> {
        self.state.lock().registry.role_of(id)
    }

    /// Ids of live connections holding `role`.
    pub fn members_of_role(&self, role: Role) -> Vec<ConnectionId> {
        self.state.lock().registry.members_of_role(role)
    }

    /// Copy of the replay history, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().history.snapshot()
    }

    /// Current counters.
    pub fn stats(&self) -> RelayStats {
        let state = self.state.lock();
        RelayStats {
            connections: state.registry.len(),
            remotes: state.registry.count_role(Role::Remote),
            robots: state.registry.count_role(Role::Robot),
            history_len: state.history.len(),
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_HISTORY_CAPACITY)
    }
}
