//! Routes `(name, payload, session)` triples to command descriptors.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::builtin::CLOSE_SESSION;
use super::descriptor::{CommandContext, CommandOutput};
use super::registry::CommandRegistry;
use crate::datasource::DataSource;
use crate::error::RelayError;
use crate::session::{SessionId, SessionIdentities, SessionStore};
use crate::Result;

/// Entry point the transport calls for every command.
///
/// Owns the registry and the shared session state; all of it is handed to
/// descriptors through [`CommandContext`], never reached through globals.
pub struct Dispatcher {
    registry: CommandRegistry,
    data_source: Arc<dyn DataSource>,
    identities: Arc<SessionIdentities>,
    sessions: Arc<SessionStore>,
}

impl Dispatcher {
    /// Create a dispatcher with fresh, empty session state.
    pub fn new(registry: CommandRegistry, data_source: Arc<dyn DataSource>) -> Self {
        Self::with_state(
            registry,
            data_source,
            Arc::new(SessionIdentities::new()),
            Arc::new(SessionStore::new()),
        )
    }

    /// Create a dispatcher sharing existing session state.
    pub fn with_state(
        registry: CommandRegistry,
        data_source: Arc<dyn DataSource>,
        identities: Arc<SessionIdentities>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            registry,
            data_source,
            identities,
            sessions,
        }
    }

    /// Look up `name` and invoke it for `session_id`.
    ///
    /// Unknown names fail with [`RelayError::UnknownCommand`] and run
    /// nothing. Validation and collaborator errors come back unchanged.
    pub async fn dispatch(
        &self,
        name: &str,
        payload: Value,
        session_id: SessionId,
    ) -> Result<CommandOutput> {
        let Some(descriptor) = self.registry.get(name) else {
            warn!(command = name, session = %session_id, "unknown command");
            return Err(RelayError::UnknownCommand(name.to_string()));
        };

        debug!(command = name, session = %session_id, "dispatching command");
        let result = descriptor.invoke(payload, self.context(session_id)).await;
        if let Err(e) = &result {
            debug!(command = name, session = %session_id, error = %e, "command failed");
        }
        result
    }

    /// Run `close-session` for every session idle for at least `max_idle`.
    ///
    /// Returns how many sessions were closed.
    pub async fn close_idle_sessions(&self, max_idle: Duration) -> Result<usize> {
        let mut closed = 0;
        for session_id in self.sessions.idle_ids(max_idle)? {
            // Skip sessions that heartbeated since the scan.
            let still_idle = self
                .sessions
                .get(&session_id)?
                .is_some_and(|s| s.idle_duration() >= max_idle);
            if !still_idle {
                continue;
            }
            self.dispatch(CLOSE_SESSION, json!({}), session_id).await?;
            closed += 1;
        }
        if closed > 0 {
            info!(closed, ?max_idle, "closed idle sessions");
        }
        Ok(closed)
    }

    /// Spawn a task that closes idle sessions every `max_idle / 2`.
    ///
    /// Must be called from within a tokio runtime. The task runs until
    /// aborted.
    pub fn spawn_idle_reaper(self: Arc<Self>, max_idle: Duration) -> JoinHandle<()> {
        let period = (max_idle / 2).max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.close_idle_sessions(max_idle).await {
                    warn!(error = %e, "idle session sweep failed");
                }
            }
        })
    }

    fn context(&self, session_id: SessionId) -> CommandContext {
        CommandContext {
            session_id,
            data_source: Arc::clone(&self.data_source),
            identities: Arc::clone(&self.identities),
            sessions: Arc::clone(&self.sessions),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn identities(&self) -> &Arc<SessionIdentities> {
        &self.identities
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }
}
