//! Per-socket lifecycle: open, read/write loops, close.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use relay_core::RelayService;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use super::connection::ClientConnection;
use super::liveness::{watch_idle, Liveness};
use crate::config::ServerConfig;

/// Per-connection knobs taken from [`ServerConfig`].
#[derive(Clone, Copy, Debug)]
pub struct ConnectionSettings {
    /// Outbound queue length.
    pub max_send_queue: usize,
    /// Ping interval.
    pub ping_interval: Duration,
    /// Close after this long without inbound activity.
    pub idle_timeout: Duration,
}

impl From<&ServerConfig> for ConnectionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_send_queue: config.max_send_queue.max(1),
            ping_interval: config.heartbeat_interval(),
            idle_timeout: config.heartbeat_timeout(),
        }
    }
}

/// Drive one upgraded socket until it closes, times out, or `shutdown` fires.
///
/// The service sees exactly one `on_open` and one `on_close` per socket.
pub async fn handle_socket(
    socket: WebSocket,
    service: RelayService,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) {
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(settings.max_send_queue);
    let conn = Arc::new(ClientConnection::new(tx));
    let id = service.on_open(conn.clone());
    let cancel = shutdown.child_token();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: queued frames out, periodic pings.
    let writer_cancel = cancel.clone();
    let writer_id = id.clone();
    let ping_every = settings.ping_interval;
    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_every);
        ping.tick().await;

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(text) = frame else { break };
                    if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                    trace!(conn_id = %writer_id, "sent ping");
                }
                () = writer_cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Reader: inbound frames into the service.
    let reader_cancel = cancel.clone();
    let reader_service = service.clone();
    let reader_conn = conn.clone();
    let reader_id = id.clone();
    let mut reader = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                next = ws_rx.next() => next,
                () = reader_cancel.cancelled() => break,
            };
            let Some(Ok(msg)) = next else { break };
            reader_conn.mark_alive();

            match msg {
                Message::Text(text) => {
                    let _ = reader_service.on_message(&reader_id, text.as_str());
                }
                Message::Binary(data) => reader_service.on_binary(&reader_id, data.len()),
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    let mut idle = tokio::spawn(watch_idle(conn.clone(), settings.idle_timeout, cancel.clone()));

    tokio::select! {
        _ = &mut writer => {}
        _ = &mut reader => {}
        result = &mut idle => {
            if let Ok(Liveness::Expired(quiet)) = result {
                warn!(conn_id = %id, idle_secs = quiet.as_secs(), "peer went silent, closing");
            }
        }
    }

    // The remaining tasks all watch `cancel` and exit on their own.
    cancel.cancel();
    service.on_close(&id);
    info!(
        conn_id = %id,
        open_secs = conn.open_for().as_secs(),
        dropped_frames = conn.drop_count(),
        "socket closed"
    );
}
