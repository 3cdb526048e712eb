//! HTTP and WebSocket transport for the command dispatcher.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1/` - API information
//! - `GET /api/v1/commands` - Registered commands and payload schemas
//!
//! ### Sessions
//! - `POST /api/v1/sessions` - Open a session (`handshake`)
//! - `GET /api/v1/sessions/{id}` - Session status
//! - `DELETE /api/v1/sessions/{id}` - Close a session (`close-session`)
//! - `POST /api/v1/sessions/{id}/commands/{command}` - Run a command
//!
//! ### Streaming
//! - `WS /api/v1/ws` - One session per connection
//!
//! ## Example
//!
//! ```no_run
//! use session_relay::api::{bind, serve, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> session_relay::Result<()> {
//!     let listener = bind(&ServerConfig::new("127.0.0.1", 3000)).await?;
//!     serve(listener, AppState::in_memory()?, std::future::pending()).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;
pub mod websocket;

pub use handlers::AppState;
pub use router::{bind, create_router, serve, ServerConfig};
pub use types::{
    CommandResponse, CreateSessionResponse, ErrorResponse, ListCommandsResponse, SessionSummary,
    WsMessage,
};
pub use websocket::serve_socket;
