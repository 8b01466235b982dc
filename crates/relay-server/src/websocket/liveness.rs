//! Idle-deadline watch for one socket.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Why [`watch_idle`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No inbound frame or pong for at least the timeout; carries the idle time.
    Expired(Duration),
    /// The socket is closing for another reason.
    Cancelled,
}

/// Sleep until `timeout` after the last inbound activity, pushing the
/// deadline out each time the peer has been heard from meanwhile.
pub async fn watch_idle(
    conn: Arc<ClientConnection>,
    timeout: Duration,
    cancel: CancellationToken,
) -> Liveness {
    loop {
        let idle = conn.idle_for();
        if idle >= timeout {
            return Liveness::Expired(idle);
        }
        tokio::select! {
            () = tokio::time::sleep(timeout - idle) => {}
            () = cancel.cancelled() => return Liveness::Cancelled,
        }
    }
}
