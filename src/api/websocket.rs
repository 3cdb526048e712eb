//! WebSocket transport: one connection, one session.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, warn};

use super::handlers::AppState;
use super::types::WsMessage;
use crate::command::builtin::{CLOSE_SESSION, HANDSHAKE};
use crate::session::SessionId;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    serve_socket(sink, stream, state, SessionId::new()).await;
}

/// Run one session over a frame sink and stream.
///
/// The session is opened with `handshake` before the greeting frame and
/// closed with `close-session` when the stream ends, yields an error, or
/// the peer sends a close frame. The close runs even if the handshake
/// failed or the peer vanished mid-reply.
pub async fn serve_socket<S, R, E>(mut sink: S, mut stream: R, state: AppState, session_id: SessionId)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let greeting = match state
        .dispatcher
        .dispatch(HANDSHAKE, serde_json::json!({}), session_id)
        .await
    {
        Ok(_) => WsMessage::Session { session_id },
        Err(e) => WsMessage::from_error(None, &e),
    };
    if send(&mut sink, &greeting).await {
        while let Some(msg) = stream.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(data)) => {
                    let _ = sink.send(Message::Pong(data)).await;
                    continue;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!(session = %session_id, error = %e, "websocket read failed");
                    break;
                }
            };

            if let Some(reply) = handle_text(&state, session_id, &text).await {
                if !send(&mut sink, &reply).await {
                    break;
                }
            }
        }
    }

    if let Err(e) = state
        .dispatcher
        .dispatch(CLOSE_SESSION, serde_json::json!({}), session_id)
        .await
    {
        warn!(session = %session_id, error = %e, "failed to close websocket session");
    }
    debug!(session = %session_id, "websocket closed");
}

/// Serialize and send a frame. Returns `false` once the peer is gone.
async fn send<S>(sink: &mut S, msg: &WsMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => true,
    }
}

/// Turn one client text frame into the reply frame, if any.
pub(crate) async fn handle_text(state: &AppState, session_id: SessionId, text: &str) -> Option<WsMessage> {
    let msg: WsMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            return Some(WsMessage::Error {
                request_id: None,
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                details: None,
            })
        }
    };

    match msg {
        WsMessage::Command {
            request_id,
            command,
            payload,
        } => Some(
            match state.dispatcher.dispatch(&command, payload, session_id).await {
                Ok(data) => WsMessage::Result {
                    request_id,
                    command,
                    data,
                },
                Err(e) => WsMessage::from_error(request_id, &e),
            },
        ),
        WsMessage::Ping => Some(WsMessage::Pong),
        // Ignore server-only message types from the client
        _ => None,
    }
}
