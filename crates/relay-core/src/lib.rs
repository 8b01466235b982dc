//! # relay-core
//!
//! Transport-agnostic core of the remote/robot relay.
//!
//! - [`registry`]: live connections, their role and profile
//! - [`history`]: bounded replay log
//! - [`router`]: registration and opposite-role fan-out under one lock
//! - [`service`]: open / message / close entry points for a transport
//! - [`protocol`]: inbound command decoding, outbound frame encoding

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod history;
pub mod ids;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{PeerSink, Profile, Role};
pub use errors::RelayError;
pub use history::{HistoryBuffer, HistoryEntry, DEFAULT_HISTORY_CAPACITY};
pub use ids::ConnectionId;
pub use router::{MessageRouter, RelayStats, Routed};
pub use service::RelayService;
