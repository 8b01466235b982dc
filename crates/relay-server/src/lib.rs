//! # relay-server
//!
//! Axum HTTP + `WebSocket` transport for the remote/robot relay.
//!
//! - `/ws`: one `RelayService` connection per socket, pings, idle timeout, bounded send queue
//! - `/health`: uptime and live role counts
//! - [`RelayServer::shutdown`] closes every socket and drains their tasks

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod server;
pub mod websocket;

pub use config::ServerConfig;
pub use server::RelayServer;
