//! Live transport session records.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::SessionId;
use crate::error::RelayError;
use crate::Result;

/// A session opened by the transport via `handshake`.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Time the handshake completed.
    pub opened_at: Instant,
    /// Time of the last handshake or heartbeat.
    pub last_heartbeat: Instant,
    /// Number of heartbeats received.
    pub heartbeats: u64,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            opened_at: now,
            last_heartbeat: now,
            heartbeats: 0,
        }
    }

    /// Record a heartbeat.
    pub fn touch(&mut self) {
        self.last_heartbeat = Instant::now();
        self.heartbeats += 1;
    }

    /// Time since the last heartbeat.
    pub fn idle_duration(&self) -> Duration {
        self.last_heartbeat.elapsed()
    }
}

/// Thread-safe storage for open sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as open. Re-opening an existing session only refreshes it.
    ///
    /// Returns `true` if the session was not known before.
    pub fn open(&self, id: SessionId) -> Result<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;

        match sessions.get_mut(&id) {
            Some(session) => {
                session.last_heartbeat = Instant::now();
                Ok(false)
            }
            None => {
                sessions.insert(id, Session::new(id));
                Ok(true)
            }
        }
    }

    /// Record a heartbeat for `id`.
    pub fn touch(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;

        sessions
            .get_mut(id)
            .ok_or_else(|| RelayError::SessionNotFound(id.to_string()))?
            .touch();
        Ok(())
    }

    /// Get a copy of the session with the given ID.
    pub fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| RelayError::LockPoisoned)?;
        Ok(sessions.get(id).cloned())
    }

    pub fn contains(&self, id: &SessionId) -> Result<bool> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| RelayError::LockPoisoned)?;
        Ok(sessions.contains_key(id))
    }

    /// Remove a session. Returns the removed record, if there was one.
    pub fn remove(&self, id: &SessionId) -> Result<Option<Session>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;
        Ok(sessions.remove(id))
    }

    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// IDs of sessions with no handshake or heartbeat for at least
    /// `max_idle`, most idle first.
    pub fn idle_ids(&self, max_idle: Duration) -> Result<Vec<SessionId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| RelayError::LockPoisoned)?;
        let mut idle: Vec<&Session> = sessions
            .values()
            .filter(|s| s.idle_duration() >= max_idle)
            .collect();
        idle.sort_by_key(|s| s.last_heartbeat);
        Ok(idle.into_iter().map(|s| s.id).collect())
    }

    /// Drop every session. Returns how many were open.
    pub fn clear(&self) -> Result<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::LockPoisoned)?;
        let count = sessions.len();
        sessions.clear();
        Ok(count)
    }
}
