//! API router configuration.

use std::future::Future;

use axum::{
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_info, create_session, delete_session, get_session, health, list_commands, run_command,
    AppState,
};
use super::websocket::ws_handler;
use crate::error::RelayError;

/// Create the API router over the given state.
pub fn create_router(state: AppState) -> Router {
    // Session routes
    let session_routes = Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/commands/{command}", post(run_command));

    // API v1 routes
    let api_v1 = Router::new()
        .route("/", get(api_info))
        .route("/commands", get(list_commands))
        .route("/ws", any(ws_handler))
        .nest("/sessions", session_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Drain in-flight HTTP requests before stopping.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 3000)
    }
}

/// Bind the listening socket.
pub async fn bind(config: &ServerConfig) -> crate::Result<TcpListener> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await.map_err(RelayError::Io)?;
    tracing::info!("session-relay API listening on {}", addr);
    Ok(listener)
}

/// Serve the API on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(RelayError::Io)?;

    tracing::info!("session-relay API stopped");
    Ok(())
}
