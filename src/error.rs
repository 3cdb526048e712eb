//! Error types for session-relay.

use thiserror::Error;

use crate::command::ValidationError;
use crate::datasource::CollaboratorError;

/// Main error type for session-relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Payload did not match the command's declared schema.
    #[error("invalid payload for '{command}': {source}")]
    Validation {
        command: String,
        #[source]
        source: ValidationError,
    },

    /// No command is registered under the given name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Failure reported by the data source, passed through unchanged.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Two descriptors were registered under the same name.
    #[error("duplicate command registered: {0}")]
    DuplicateCommand(String),

    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for session-relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
