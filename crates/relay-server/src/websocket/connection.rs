//! WebSocket client connection state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use relay_core::PeerSink;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Outbound side of one WebSocket client.
///
/// Frames go through a bounded queue drained by the socket writer task;
/// when the queue is full the frame is dropped rather than waited on.
pub struct ClientConnection {
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    last_seen: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection writing into `tx`.
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            tx,
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Frames this peer never received.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// How long the socket has been open.
    pub fn open_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Record inbound activity (pong or any frame).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound activity.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

impl PeerSink for ClientConnection {
    fn send(&self, frame: Arc<String>) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                let drops = self.dropped_messages.fetch_add(1, Ordering::Relaxed) + 1;
                counter!("relay_send_queue_full_total").increment(1);
                tracing::warn!(
                    frame_len = frame.len(),
                    total_drops = drops,
                    "send queue full, dropping frame"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}
