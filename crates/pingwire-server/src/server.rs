//! `EchoServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use pingwire_core::ConnectionId;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::connection::ClientConnection;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::{SessionContext, run_ws_session};
use crate::websocket::supervisor::LivenessSupervisor;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Supervisor, registry, and shutdown signal handed to each session.
    pub session: SessionContext,
    /// When the server was created.
    pub start_time: Instant,
    /// Per-connection outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Max inbound message size in bytes.
    pub max_message_size: usize,
}

enum Lifecycle {
    Idle,
    Running {
        addr: SocketAddr,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// The echo server.
///
/// Created idle. [`start`](Self::start) binds and serves in a background
/// task; [`stop`](Self::stop) closes every session and waits for the serve
/// task. A stopped server cannot be restarted.
pub struct EchoServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    supervisor: Arc<LivenessSupervisor>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    lifecycle: Mutex<Lifecycle>,
}

impl EchoServer {
    /// Create a new server. Nothing is bound until [`start`](Self::start).
    ///
    /// A zero queue capacity or message size is raised to 1.
    pub fn new(mut config: ServerConfig) -> Self {
        config.send_queue_capacity = config.send_queue_capacity.max(1);
        config.max_message_size = config.max_message_size.max(1);
        let supervisor = LivenessSupervisor::new(config.probe_interval());
        Self {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            supervisor: Arc::new(supervisor),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            session: SessionContext {
                supervisor: self.supervisor.clone(),
                registry: self.registry.clone(),
                shutdown: self.shutdown.token(),
            },
            start_time: self.start_time,
            send_queue_capacity: self.config.send_queue_capacity,
            max_message_size: self.config.max_message_size,
        };

        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }

    /// Bind the configured address and begin accepting connections.
    ///
    /// Returns the bound address (useful with port `0`).
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Running { .. } => return Err(ServerError::AlreadyStarted),
            Lifecycle::Stopped => return Err(ServerError::Stopped),
            Lifecycle::Idle => {}
        }

        let bind = self.config.bind_address();
        let listener = TcpListener::bind(&bind)
            .await
            .map_err(|source| ServerError::Bind { addr: bind, source })?;
        let addr = listener.local_addr()?;

        let router = self.router();
        let token = self.shutdown.token();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server terminated with error");
            }
        });

        info!(
            %addr,
            probe_interval_ms = self.config.probe_interval_ms,
            "echo server listening"
        );
        *lifecycle = Lifecycle::Running { addr, task };
        Ok(addr)
    }

    /// Close every session and stop accepting connections.
    ///
    /// Idempotent, and a no-op on a server that was never started. Waits at
    /// most the configured shutdown timeout.
    pub async fn stop(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.lock().await;
            if !matches!(*lifecycle, Lifecycle::Running { .. }) {
                return;
            }
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };

        if let Lifecycle::Running { addr, task } = previous {
            info!(%addr, "stopping echo server");
            let _ = self
                .shutdown
                .drain(task, self.config.shutdown_timeout())
                .await;
            info!("echo server stopped");
        }
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match *self.lifecycle.lock().await {
            Lifecycle::Running { addr, .. } => Some(addr),
            _ => None,
        }
    }

    /// Whether the server is currently accepting connections.
    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running { .. })
    }

    /// Live connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

/// GET / and GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (tx, rx) = mpsc::channel(state.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
    run_ws_session(socket, connection, rx, state.session).await;
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.session.registry.connection_count().await;
    Json(health::health_check(state.start_time, connections))
}
