//! WebSocket transport for the relay.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Outbound queue for one client, implements `PeerSink` |
//! | `handler` | Per-socket reader/writer tasks feeding `RelayService` |
//! | `liveness` | Closes sockets that stay silent past the timeout |

pub mod connection;
pub mod handler;
pub mod liveness;
