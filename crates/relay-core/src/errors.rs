//! Relay error taxonomy.

use crate::connection::Role;
use crate::ids::ConnectionId;

/// Reasons an inbound event was not acted on.
///
/// None of these close the connection; the service logs them and, when
/// rejection notices are enabled, reports the peer-visible ones back.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// A registration frame whose `parameters` could not be read.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A data message from a connection that has no role yet.
    #[error("data message from unregistered connection {0}")]
    UnregisteredSender(ConnectionId),

    /// A second registration; the first one stands.
    #[error("connection {id} already registered as {role}")]
    AlreadyRegistered {
        /// Sender.
        id: ConnectionId,
        /// Role it already holds.
        role: Role,
    },

    /// The connection is no longer tracked.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

impl RelayError {
    /// Stable code for logs, metrics labels and rejection notices.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::UnregisteredSender(_) => "UNREGISTERED_SENDER",
            Self::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            Self::UnknownConnection(_) => "UNKNOWN_CONNECTION",
        }
    }

    /// Whether the sending peer may be told about this rejection.
    pub fn is_peer_visible(&self) -> bool {
        !matches!(self, Self::UnknownConnection(_))
    }
}
