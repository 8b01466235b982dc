//! Server configuration.

use std::time::Duration;

use relay_core::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
///
/// Every field has a default, so a config file may set any subset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `1337`, `0` for auto-assign).
    pub port: u16,
    /// Per-connection outbound queue length; frames beyond it are dropped.
    pub max_send_queue: usize,
    /// Ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Messages kept for replay to new connections.
    pub history_capacity: usize,
    /// Send an `error` frame to peers whose frame was rejected.
    pub notify_rejections: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 1337,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            notify_rejections: false,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ping interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Pong timeout.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs.max(1))
    }
}
