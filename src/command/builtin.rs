//! Session lifecycle commands registered alongside every domain module.

use serde::de::IgnoredAny;
use serde_json::json;
use tracing::{debug, info};

use super::descriptor::{CommandContext, CommandDescriptor, CommandOutput};
use super::schema::ObjectSchema;
use crate::Result;

pub const HANDSHAKE: &str = "handshake";
pub const CLOSE_SESSION: &str = "close-session";
pub const HEARTBEAT: &str = "heartbeat";

/// `handshake`, `close-session` and `heartbeat`.
pub fn commands() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor::new(HANDSHAKE, ObjectSchema::new(), handshake),
        CommandDescriptor::new(CLOSE_SESSION, ObjectSchema::new(), close_session),
        CommandDescriptor::new(HEARTBEAT, ObjectSchema::new(), heartbeat),
    ]
}

/// Record the session as open. → `{session_id, version}`
async fn handshake(_: IgnoredAny, ctx: CommandContext) -> Result<CommandOutput> {
    if ctx.sessions.open(ctx.session_id)? {
        info!(session = %ctx.session_id, "session opened");
    }
    Ok(Some(json!({
        "session_id": ctx.session_id,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Forget the session: its identity binding and its record.
async fn close_session(_: IgnoredAny, ctx: CommandContext) -> Result<CommandOutput> {
    let user = ctx.identities.unbind(&ctx.session_id)?;
    let record = ctx.sessions.remove(&ctx.session_id)?;
    if record.is_some() || user.is_some() {
        info!(
            session = %ctx.session_id,
            user = user.as_deref().unwrap_or("-"),
            "session closed"
        );
    }
    Ok(None)
}

/// → `{session_id, authenticated, user_id}`
async fn heartbeat(_: IgnoredAny, ctx: CommandContext) -> Result<CommandOutput> {
    // A heartbeat from a session we have no record of re-opens it.
    if ctx.sessions.touch(&ctx.session_id).is_err() {
        ctx.sessions.open(ctx.session_id)?;
    }
    let user = ctx.identities.principal(&ctx.session_id)?;
    debug!(session = %ctx.session_id, "heartbeat");
    Ok(Some(json!({
        "session_id": ctx.session_id,
        "authenticated": user.is_some(),
        "user_id": user,
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::datasource::MemoryDataSource;
    use crate::session::{SessionId, SessionIdentities, SessionStore};

    fn context() -> CommandContext {
        CommandContext {
            session_id: SessionId::from_raw(0xabc),
            data_source: Arc::new(MemoryDataSource::new()),
            identities: Arc::new(SessionIdentities::new()),
            sessions: Arc::new(SessionStore::new()),
        }
    }

    fn find(name: &str) -> CommandDescriptor {
        commands().into_iter().find(|c| c.name() == name).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_opens_session() {
        let ctx = context();
        let out = find(HANDSHAKE)
            .invoke(json!({}), ctx.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out["session_id"], "sess-00000000000000000000000000000abc");
        assert!(ctx.sessions.contains(&ctx.session_id).unwrap());
    }

    #[tokio::test]
    async fn test_close_session_unbinds_identity() {
        let ctx = context();
        find(HANDSHAKE).invoke(json!({}), ctx.clone()).await.unwrap();
        ctx.identities.bind(ctx.session_id, "alice").unwrap();

        let out = find(CLOSE_SESSION).invoke(json!({}), ctx.clone()).await.unwrap();

        assert!(out.is_none());
        assert!(!ctx.identities.is_authenticated(&ctx.session_id));
        assert!(!ctx.sessions.contains(&ctx.session_id).unwrap());
    }

    #[tokio::test]
    async fn test_close_unknown_session_is_noop() {
        let ctx = context();
        assert!(find(CLOSE_SESSION).invoke(json!({}), ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_heartbeat_reports_identity() {
        let ctx = context();
        find(HANDSHAKE).invoke(json!({}), ctx.clone()).await.unwrap();

        let out = find(HEARTBEAT).invoke(json!({}), ctx.clone()).await.unwrap().unwrap();
        assert_eq!(out["authenticated"], false);
        assert!(out["user_id"].is_null());

        ctx.identities.bind(ctx.session_id, "alice").unwrap();
        let out = find(HEARTBEAT).invoke(json!({}), ctx.clone()).await.unwrap().unwrap();
        assert_eq!(out["authenticated"], true);
        assert_eq!(out["user_id"], "alice");

        let session = ctx.sessions.get(&ctx.session_id).unwrap().unwrap();
        assert_eq!(session.heartbeats, 2);
    }

    #[tokio::test]
    async fn test_heartbeat_without_handshake_reopens() {
        let ctx = context();
        find(HEARTBEAT).invoke(json!({}), ctx.clone()).await.unwrap();
        assert!(ctx.sessions.contains(&ctx.session_id).unwrap());
    }
}
