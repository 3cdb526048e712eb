//! Session identity map: which principal owns which session.

use std::collections::HashMap;
use std::sync::RwLock;

use super::SessionId;
use crate::error::RelayError;
use crate::Result;

/// Thread-safe `SessionId -> user ID` map.
///
/// A session is bound to at most one user at a time. Binding an already
/// bound session replaces the previous user. Each call takes the lock for
/// the duration of a single read or write, so unrelated sessions never
/// block each other across an await point.
#[derive(Debug, Default)]
pub struct SessionIdentities {
    bindings: RwLock<HashMap<SessionId, String>>,
}

impl SessionIdentities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session` to `user_id`, returning the previously bound user.
    pub fn bind(&self, session: SessionId, user_id: impl Into<String>) -> Result<Option<String>> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;
        Ok(bindings.insert(session, user_id.into()))
    }

    /// Remove any binding for `session`. Absent sessions are not an error.
    pub fn unbind(&self, session: &SessionId) -> Result<Option<String>> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;
        Ok(bindings.remove(session))
    }

    /// The user currently bound to `session`, if any.
    pub fn principal(&self, session: &SessionId) -> Result<Option<String>> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| RelayError::LockPoisoned)?;
        Ok(bindings.get(session).cloned())
    }

    pub fn is_authenticated(&self, session: &SessionId) -> bool {
        self.principal(session).ok().flatten().is_some()
    }

    /// Number of authenticated sessions.
    pub fn count(&self) -> usize {
        self.bindings.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Sessions currently bound to `user_id`.
    pub fn sessions_of(&self, user_id: &str) -> Result<Vec<SessionId>> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| RelayError::LockPoisoned)?;
        let mut sessions: Vec<SessionId> = bindings
            .iter()
            .filter(|(_, user)| user.as_str() == user_id)
            .map(|(session, _)| *session)
            .collect();
        sessions.sort();
        Ok(sessions)
    }

    /// Drop every binding, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;
        let removed = bindings.len();
        bindings.clear();
        Ok(removed)
    }
}
