//! Transport-facing entry points: open, message, close.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::connection::PeerSink;
use crate::errors::RelayError;
use crate::ids::ConnectionId;
use crate::protocol::{OutboundFrame, RejectionNotice};
use crate::router::{now_millis, MessageRouter, RelayStats, Routed};

/// Wires transport events to the [`MessageRouter`].
#[derive(Clone)]
pub struct RelayService {
    router: Arc<MessageRouter>,
    notify_rejections: bool,
}

impl RelayService {
    /// Create a service over `router`. With `notify_rejections` the sender
    /// of a rejected frame receives an `error` frame.
    pub fn new(router: Arc<MessageRouter>, notify_rejections: bool) -> Self {
        Self {
            router,
            notify_rejections,
        }
    }

    /// The underlying router.
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// Live counters.
    pub fn stats(&self) -> RelayStats {
        self.router.stats()
    }

    /// A transport connection was accepted. Replays history if any exists.
    pub fn on_open(&self, sink: Arc<dyn PeerSink>) -> ConnectionId {
        let (id, history) = self.router.connect(Arc::clone(&sink), now_millis());
        info!(conn_id = %id, "connection opened");

        if history.is_empty() {
            return id;
        }
        match OutboundFrame::History(&history).encode() {
            Ok(json) => {
                if !sink.send(Arc::new(json)) {
                    warn!(conn_id = %id, entries = history.len(), "failed to queue history replay");
                }
            }
            Err(e) => warn!(conn_id = %id, error = %e, "failed to encode history frame"),
        }
        id
    }

    /// A text frame arrived on `id`.
    pub fn on_message(&self, id: &ConnectionId, text: &str) -> Result<Routed, RelayError> {
        let result = self.router.route(id, text);
        if let Err(err) = &result {
            self.reject(id, err);
        }
        result
    }

    /// A non-text frame arrived on `id`; it is not interpreted.
    pub fn on_binary(&self, id: &ConnectionId, len: usize) {
        debug!(conn_id = %id, len, "ignoring non-text frame");
    }

    /// The transport connection closed. Safe to call more than once.
    pub fn on_close(&self, id: &ConnectionId) {
        match self.router.disconnect(id) {
            Some(conn) => info!(
                conn_id = %id,
                role = conn.role().map_or("unset", |r| r.as_str()),
                registered_ms = ?conn.registered_at().map(|at| now_millis() - at),
                "connection closed"
            ),
            None => debug!(conn_id = %id, "close for unknown connection ignored"),
        }
    }

    fn reject(&self, id: &ConnectionId, err: &RelayError) {
        counter!("relay_rejected_total", "reason" => err.error_code()).increment(1);
        if !err.is_peer_visible() {
            debug!(conn_id = %id, error = %err, "frame for unknown connection ignored");
            return;
        }
        warn!(conn_id = %id, code = err.error_code(), error = %err, "frame rejected");

        if !self.notify_rejections {
            return;
        }
        let Some(sink) = self.router.sink_of(id) else {
            return;
        };
        match OutboundFrame::Error(RejectionNotice::from(err)).encode() {
            Ok(json) => {
                let _ = sink.send(Arc::new(json));
            }
            Err(e) => warn!(conn_id = %id, error = %e, "failed to encode rejection notice"),
        }
    }
}
