//! REST API handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::types::{
    CommandResponse, CreateSessionResponse, ErrorResponse, ListCommandsResponse, SessionSummary,
};
use crate::command::builtin::{CLOSE_SESSION, HANDSHAKE};
use crate::command::{CommandRegistry, Dispatcher};
use crate::datasource::MemoryDataSource;
use crate::error::RelayError;
use crate::session::SessionId;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Standard commands over an empty in-memory data source.
    pub fn in_memory() -> crate::Result<Self> {
        let dispatcher = Dispatcher::new(
            CommandRegistry::standard()?,
            Arc::new(MemoryDataSource::new()),
        );
        Ok(Self::new(Arc::new(dispatcher)))
    }
}

fn api_error(err: &RelayError) -> ApiError {
    let (status, body) = ErrorResponse::from_error(err);
    (status, Json(body))
}

/// Parse a path session ID and make sure the session is open.
fn open_session(state: &AppState, raw: &str) -> Result<SessionId, ApiError> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::session_not_found(raw)),
        )
    };

    let id: SessionId = raw.parse().map_err(|_| not_found())?;
    match state.dispatcher.sessions().contains(&id) {
        Ok(true) => Ok(id),
        Ok(false) => Err(not_found()),
        Err(e) => Err(api_error(&e)),
    }
}

fn summarize(state: &AppState, id: &SessionId) -> Result<Option<SessionSummary>, RelayError> {
    let Some(session) = state.dispatcher.sessions().get(id)? else {
        return Ok(None);
    };
    let user = state.dispatcher.identities().principal(id)?;
    Ok(Some(SessionSummary::new(&session, user)))
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "name": "session-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "commands": state.dispatcher.registry().len(),
    }))
}

/// List registered commands and their payload schemas.
pub async fn list_commands(State(state): State<AppState>) -> Json<ListCommandsResponse> {
    let commands = state.dispatcher.registry().describe();
    Json(ListCommandsResponse {
        count: commands.len(),
        commands,
    })
}

/// Open a new session (runs `handshake`).
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session_id = SessionId::new();
    let handshake = state
        .dispatcher
        .dispatch(HANDSHAKE, serde_json::json!({}), session_id)
        .await
        .map_err(|e| api_error(&e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            handshake,
        }),
    ))
}

/// Get session status.
///
/// The session ID is the caller's credential. Sessions are never
/// enumerated.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let id = open_session(&state, &session_id)?;
    summarize(&state, &id)
        .map_err(|e| api_error(&e))?
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::session_not_found(&session_id)),
            )
        })
}

/// Close a session (runs `close-session`).
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = open_session(&state, &session_id)?;
    state
        .dispatcher
        .dispatch(CLOSE_SESSION, serde_json::json!({}), id)
        .await
        .map_err(|e| api_error(&e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Run a command on an open session.
///
/// The request body is the command payload; an empty body means `{}`.
pub async fn run_command(
    State(state): State<AppState>,
    Path((session_id, command)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<CommandResponse>, ApiError> {
    let id = open_session(&state, &session_id)?;

    let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Request body is not valid JSON")
                    .with_details(e.to_string())),
            )
        })?
    };

    let data = state
        .dispatcher
        .dispatch(&command, payload, id)
        .await
        .map_err(|e| api_error(&e))?;

    Ok(Json(CommandResponse { command, data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_in_memory() {
        let state = AppState::in_memory().unwrap();
        assert_eq!(state.dispatcher.sessions().count(), 0);
        assert_eq!(state.dispatcher.registry().len(), 7);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(health().await, "OK");
    }

    #[tokio::test]
    async fn test_api_info_endpoint() {
        let state = AppState::in_memory().unwrap();
        let json = api_info(State(state)).await.0;
        assert_eq!(json["name"], "session-relay");
        assert_eq!(json["status"], "running");
        assert_eq!(json["commands"], 7);
    }

    #[tokio::test]
    async fn test_create_session_registers_it() {
        let state = AppState::in_memory().unwrap();
        let (status, Json(body)) = create_session(State(state.clone())).await.unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(state.dispatcher.sessions().contains(&body.session_id).unwrap());
    }

    #[test]
    fn test_open_session_rejects_garbage_and_unknown() {
        let state = AppState::in_memory().unwrap();
        let (status, _) = open_session(&state, "not-a-session").unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = open_session(&state, &SessionId::new().to_string()).unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
