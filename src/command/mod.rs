//! Command dispatch.
//!
//! Every remote command is a [`CommandDescriptor`]: a unique name, an
//! [`ObjectSchema`] for its payload and an async body. Descriptors are
//! collected into a [`CommandRegistry`] once at startup, and the transport
//! calls [`Dispatcher::dispatch`] with `(name, payload, session)`.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_relay::command::{CommandRegistry, Dispatcher};
//! use session_relay::datasource::MemoryDataSource;
//! use session_relay::SessionId;
//!
//! # async fn run() -> session_relay::Result<()> {
//! let dispatcher = Dispatcher::new(
//!     CommandRegistry::standard()?,
//!     Arc::new(MemoryDataSource::new()),
//! );
//! let session = SessionId::new();
//! dispatcher
//!     .dispatch("handshake", serde_json::json!({}), session)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod builtin;
mod descriptor;
mod dispatcher;
mod registry;
mod schema;

pub use descriptor::{CommandContext, CommandDescriptor, CommandOutput};
pub use dispatcher::Dispatcher;
pub use registry::{CommandInfo, CommandRegistry};
pub use schema::{Field, FieldKind, ObjectSchema, ValidationError};
