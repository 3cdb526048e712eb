//! # session-relay
//!
//! Session-scoped command dispatcher with coordinated process shutdown.
//!
//! Clients open a session, then invoke named commands on it. Every command
//! declares a payload schema; the [`Dispatcher`] validates the payload
//! before the command body runs, so bodies only ever see well-formed
//! input. Authentication commands record which user each session belongs
//! to in a shared [`SessionIdentities`] map.
//!
//! Independently, a [`ShutdownCoordinator`] turns the first termination
//! signal into an ordered run of registered cleanup jobs followed by a
//! process exit whose code says whether every job succeeded.
//!
//! ## Features
//!
//! - **Schema-checked commands**: Typed inputs, validated up front
//! - **Pluggable backend**: Credentials and tokens behind [`DataSource`]
//! - **HTTP + WebSocket**: axum transport over the same dispatcher
//! - **Ordered shutdown**: Sequential cleanup jobs with a single exit
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_relay::{CommandRegistry, Dispatcher, MemoryDataSource, SessionId};
//!
//! #[tokio::main]
//! async fn main() -> session_relay::Result<()> {
//!     // Initialize logging
//!     session_relay::logging::try_init().ok();
//!
//!     let dispatcher = Dispatcher::new(
//!         CommandRegistry::standard()?,
//!         Arc::new(MemoryDataSource::new()),
//!     );
//!
//!     let session = SessionId::new();
//!     let reply = dispatcher
//!         .dispatch("handshake", serde_json::json!({}), session)
//!         .await?;
//!
//!     println!("Session {} opened: {:?}", session, reply);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod command;
pub mod config;
pub mod datasource;
pub mod error;
pub mod logging;
pub mod session;
pub mod shutdown;

// Re-export commonly used types
pub use command::{
    CommandContext, CommandDescriptor, CommandOutput, CommandRegistry, Dispatcher, ObjectSchema,
    ValidationError,
};
pub use datasource::{CollaboratorError, DataSource, MemoryDataSource, SeedUser};
pub use error::{RelayError, Result};
pub use session::{Session, SessionId, SessionIdentities, SessionStore};
pub use shutdown::{
    JobId, ProcessExit, ShutdownConfig, ShutdownCoordinator, ShutdownJobs, ShutdownOutcome,
    StdProcessExit,
};
