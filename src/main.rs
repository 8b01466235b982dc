//! # robot-relay
//!
//! Relay server binary: parses the CLI, loads configuration, starts the
//! WebSocket server and waits for Ctrl-C.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_server::{RelayServer, ServerConfig};
use relay_telemetry::TelemetryConfig;

/// Remote/robot WebSocket message relay.
#[derive(Parser, Debug)]
#[command(name = "robot-relay", about = "Remote/robot WebSocket message relay")]
struct Cli {
    /// JSON config file; CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Messages kept for replay to new connections.
    #[arg(long)]
    history_capacity: Option<usize>,

    /// Tell peers when their frame is rejected.
    #[arg(long)]
    notify_rejections: bool,

    /// Log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(capacity) = self.history_capacity {
            config.history_capacity = capacity;
        }
        if self.notify_rejections {
            config.notify_rejections = true;
        }
        Ok(config)
    }

    fn telemetry_config(&self) -> Result<TelemetryConfig> {
        let log_level = relay_telemetry::parse_level(&self.log_level)
            .with_context(|| format!("Invalid log level: {}", self.log_level))?;
        Ok(TelemetryConfig {
            log_level,
            json: self.log_json,
            ..TelemetryConfig::default()
        })
    }
}

fn read_config(path: &Path) -> Result<ServerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = relay_telemetry::init_telemetry(&cli.telemetry_config()?);
    let config = cli.server_config()?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        history_capacity = config.history_capacity,
        notify_rejections = config.notify_rejections,
        "starting robot relay"
    );

    let server = RelayServer::new(config);
    let (addr, serve) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(%addr, "relay ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    let _ = server.shutdown(serve, Duration::from_secs(10)).await;
    Ok(())
}
