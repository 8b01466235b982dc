//! `/health` endpoint.

use std::time::Instant;

use relay_core::RelayStats;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live connections, registered or not.
    pub connections: usize,
    /// Connections registered as remote.
    pub remotes: usize,
    /// Connections registered as robot.
    pub robots: usize,
    /// Messages held for replay.
    pub history_len: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, stats: RelayStats) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: stats.connections,
        remotes: stats.remotes,
        robots: stats.robots,
        history_len: stats.history_len,
    }
}
