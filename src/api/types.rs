//! API request and response types.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::CommandInfo;
use crate::datasource::CollaboratorError;
use crate::error::RelayError;
use crate::session::{Session, SessionId};

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Successful command response.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    /// Name of the command that ran.
    pub command: String,
    /// Result object; absent for commands with no result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response for session creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    /// Handshake result.
    pub handshake: Option<Value>,
}

/// Brief session summary for listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub heartbeats: u64,
    pub idle_seconds: f64,
}

impl SessionSummary {
    pub fn new(session: &Session, user_id: Option<String>) -> Self {
        Self {
            session_id: session.id,
            authenticated: user_id.is_some(),
            user_id,
            heartbeats: session.heartbeats,
            idle_seconds: session.idle_duration().as_secs_f64(),
        }
    }
}

/// List commands response.
#[derive(Debug, Clone, Serialize)]
pub struct ListCommandsResponse {
    pub count: usize,
    pub commands: Vec<CommandInfo>,
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "UNKNOWN_COMMAND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn session_not_found(id: &str) -> Self {
        Self::new("SESSION_NOT_FOUND", format!("Session '{}' not found", id))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    /// Map a dispatch error to an HTTP status and body.
    pub fn from_error(err: &RelayError) -> (StatusCode, Self) {
        match err {
            RelayError::Validation { command, source } => (
                StatusCode::BAD_REQUEST,
                Self::new("VALIDATION_ERROR", format!("Invalid payload for '{}'", command))
                    .with_details(source.to_string()),
            ),
            RelayError::UnknownCommand(name) => (
                StatusCode::NOT_FOUND,
                Self::new("UNKNOWN_COMMAND", format!("Unknown command '{}'", name)),
            ),
            RelayError::SessionNotFound(id) => {
                (StatusCode::NOT_FOUND, Self::session_not_found(id))
            }
            RelayError::Collaborator(e) => {
                let (status, code) = match e {
                    CollaboratorError::InvalidCredentials => {
                        (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
                    }
                    CollaboratorError::UserExists(_) => (StatusCode::CONFLICT, "USER_EXISTS"),
                    CollaboratorError::InvalidCaptcha => (StatusCode::BAD_REQUEST, "INVALID_CAPTCHA"),
                    CollaboratorError::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
                };
                (status, Self::new(code, e.to_string()))
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Self::internal_error(other.to_string()),
            ),
        }
    }
}

/// WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Client invokes a command on its connection's session.
    Command {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        command: String,
        #[serde(default = "empty_object")]
        payload: Value,
    },
    /// Server announces the session assigned to this connection.
    Session { session_id: SessionId },
    /// Server sends a command result.
    Result {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Error message.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Ping/pong for connection health.
    Ping,
    Pong,
}

impl WsMessage {
    /// Error frame for a failed command.
    pub fn from_error(request_id: Option<String>, err: &RelayError) -> Self {
        let (_, body) = ErrorResponse::from_error(err);
        Self::Error {
            request_id,
            code: body.code,
            message: body.message,
            details: body.details,
        }
    }
}
