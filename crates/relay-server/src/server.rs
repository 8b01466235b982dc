//! `RelayServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use relay_core::{MessageRouter, RelayService};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::websocket::handler::{self, ConnectionSettings};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Relay entry points.
    pub service: RelayService,
    /// Cancelled when the server stops; each socket watches a child.
    pub shutdown: CancellationToken,
    /// Live socket tasks.
    pub sockets: TaskTracker,
    /// When the server started.
    pub start_time: Instant,
    /// Per-connection settings.
    pub settings: ConnectionSettings,
    /// Max inbound message size in bytes.
    pub max_message_size: usize,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    service: RelayService,
    shutdown: CancellationToken,
    sockets: TaskTracker,
    start_time: Instant,
}

impl RelayServer {
    /// Create a server with a fresh registry and history.
    pub fn new(config: ServerConfig) -> Self {
        let router = Arc::new(MessageRouter::new(config.history_capacity));
        let service = RelayService::new(router, config.notify_rejections);
        Self {
            config,
            service,
            shutdown: CancellationToken::new(),
            sockets: TaskTracker::new(),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            shutdown: self.shutdown.clone(),
            sockets: self.sockets.clone(),
            start_time: self.start_time,
            settings: ConnectionSettings::from(&self.config),
            max_message_size: self.config.max_message_size,
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.clone();

        info!(%addr, history_capacity = self.config.history_capacity, "relay server listening");

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                warn!(error = %e, "server exited with error");
            }
        });

        Ok((addr, handle))
    }

    /// The relay service.
    pub fn service(&self) -> &RelayService {
        &self.service
    }

    /// Whether [`RelayServer::shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Sockets whose handler is still running.
    pub fn open_sockets(&self) -> usize {
        self.sockets.len()
    }

    /// Stop accepting, close every socket, then wait up to `timeout` for
    /// the listener and all socket handlers to finish.
    ///
    /// Returns `false` if the wait timed out.
    pub async fn shutdown(&self, serve: JoinHandle<()>, timeout: Duration) -> bool {
        self.shutdown.cancel();
        let _ = self.sockets.close();
        info!(open_sockets = self.sockets.len(), "draining relay");

        let drain = async {
            if let Err(e) = serve.await {
                warn!(error = %e, "serve task failed");
            }
            self.sockets.wait().await;
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                open_sockets = self.sockets.len(),
                timeout_secs = timeout.as_secs(),
                "shutdown timed out with sockets still open"
            );
            return false;
        }
        info!("relay drained");
        true
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.max_message_size).on_upgrade(move |socket| {
        state.sockets.track_future(handler::handle_socket(
            socket,
            state.service,
            state.settings,
            state.shutdown,
        ))
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.service.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_server() -> RelayServer {
        RelayServer::new(ServerConfig::default())
    }

    #[test]
    fn server_uses_config() {
        let server = RelayServer::new(ServerConfig {
            history_capacity: 3,
            notify_rejections: true,
            ..ServerConfig::default()
        });
        assert_eq!(server.config().history_capacity, 3);
        assert_eq!(server.service().stats().connections, 0);
        assert!(!server.is_shutting_down());
        assert_eq!(server.open_sockets(), 0);
    }

    #[tokio::test]
    async fn health_endpoint_returns_counters() {
        let app = make_server().router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["remotes"], 0);
        assert_eq!(parsed["robots"], 0);
        assert_eq!(parsed["history_len"], 0);
    }

    #[tokio::test]
    async fn ws_without_upgrade_is_rejected() {
        let app = make_server().router();
        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_on_ephemeral_port_and_shutdown() {
        let server = RelayServer::new(ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..ServerConfig::default()
        });
        let (addr, handle) = server.listen().await.unwrap();
        assert!(addr.port() > 0);

        assert!(server.shutdown(handle, Duration::from_secs(2)).await);
        assert!(server.is_shutting_down());
    }
}
