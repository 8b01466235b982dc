//! Per-connection state held by the registry.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// The side of the relay a peer registered as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Controller side (human/operator).
    Remote,
    /// Device side (actuator).
    Robot,
}

impl Role {
    /// The role whose members receive this role's broadcasts.
    pub fn opposite(self) -> Self {
        match self {
            Self::Remote => Self::Robot,
            Self::Robot => Self::Remote,
        }
    }

    /// Lowercase name, as used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Robot => "robot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-declared peer profile. Both fields are untrusted display data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name, used as the author of broadcast messages.
    pub name: String,
    /// Free-form declared type.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Profile {
    /// Build a profile from its two fields.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Outbound half of a transport connection.
///
/// `send` must not block: implementations queue the frame or drop it and
/// return `false`.
pub trait PeerSink: Send + Sync {
    /// Queue a text frame for delivery. Returns `false` if it was dropped.
    fn send(&self, frame: Arc<String>) -> bool;
}

/// A live connection tracked by the registry.
pub struct Connection {
    /// Registry key.
    pub id: ConnectionId,
    sink: Arc<dyn PeerSink>,
    role: Option<Role>,
    profile: Option<Profile>,
    /// Accept time, ms since epoch.
    pub connected_at: i64,
    registered_at: Option<i64>,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, sink: Arc<dyn PeerSink>, connected_at: i64) -> Self {
        Self {
            id,
            sink,
            role: None,
            profile: None,
            connected_at,
            registered_at: None,
        }
    }

    /// Assigned role, `None` until registration.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Registered profile, `None` until registration.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Registration time, ms since epoch.
    pub fn registered_at(&self) -> Option<i64> {
        self.registered_at
    }

    /// Whether a role has been assigned.
    pub fn is_registered(&self) -> bool {
        self.role.is_some()
    }

    /// Shared handle to the outbound sink.
    pub fn sink(&self) -> Arc<dyn PeerSink> {
        Arc::clone(&self.sink)
    }

    pub(crate) fn register(&mut self, role: Role, profile: Profile, at: i64) {
        self.role = Some(role);
        self.profile = Some(profile);
        self.registered_at = Some(at);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("profile", &self.profile)
            .field("connected_at", &self.connected_at)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}
