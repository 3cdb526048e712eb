//! In-process data source for development and tests.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CollaboratorError, DataSource};

/// A user to create at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub password: String,
    #[serde(default)]
    pub permissions: String,
}

#[derive(Debug, Clone)]
struct UserRecord {
    password: String,
    permissions: String,
}

/// Data source backed by in-memory maps.
///
/// Passwords are kept in plain text and any non-empty CAPTCHA token is
/// accepted, so this backend suits development and tests. Issued tokens
/// are random and cannot be derived from one another.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    users: RwLock<HashMap<String, UserRecord>>,
    tokens: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a data source pre-populated with `users`.
    ///
    /// Later entries with a duplicate ID replace earlier ones.
    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = SeedUser>,
    {
        let records = users
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    UserRecord {
                        password: u.password,
                        permissions: u.permissions,
                    },
                )
            })
            .collect();

        Self {
            users: RwLock::new(records),
            tokens: RwLock::default(),
        }
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    /// Permissions string stored for `id`.
    pub fn permissions_of(&self, id: &str) -> Option<String> {
        self.users
            .read()
            .ok()
            .and_then(|u| u.get(id).map(|r| r.permissions.clone()))
    }

    /// Invalidate every token issued to `user_id`.
    pub fn revoke_tokens(&self, user_id: &str) -> usize {
        self.tokens
            .write()
            .ok()
            .and_then(|mut t| t.remove(user_id))
            .map(|set| set.len())
            .unwrap_or(0)
    }

    fn check_captcha(token: &str) -> Result<(), CollaboratorError> {
        if token.trim().is_empty() {
            return Err(CollaboratorError::InvalidCaptcha);
        }
        Ok(())
    }
}

fn poisoned() -> CollaboratorError {
    CollaboratorError::Backend("storage lock poisoned".into())
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn login(
        &self,
        id: &str,
        password: &str,
        captcha_token: &str,
    ) -> Result<String, CollaboratorError> {
        Self::check_captcha(captcha_token)?;

        {
            let users = self.users.read().map_err(|_| poisoned())?;
            match users.get(id) {
                Some(record) if record.password == password => {}
                _ => return Err(CollaboratorError::InvalidCredentials),
            }
        }

        let token = issue_token();
        self.tokens
            .write()
            .map_err(|_| poisoned())?
            .entry(id.to_string())
            .or_default()
            .insert(token.clone());
        Ok(token)
    }

    async fn add_user(
        &self,
        id: &str,
        password: &str,
        permissions: &str,
        captcha_token: &str,
    ) -> Result<(), CollaboratorError> {
        Self::check_captcha(captcha_token)?;

        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.contains_key(id) {
            return Err(CollaboratorError::UserExists(id.to_string()));
        }
        users.insert(
            id.to_string(),
            UserRecord {
                password: password.to_string(),
                permissions: permissions.to_string(),
            },
        );
        Ok(())
    }

    async fn verify_token(&self, user_id: &str, token: &str) -> Result<bool, CollaboratorError> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        Ok(tokens
            .get(user_id)
            .map(|set| set.contains(token))
            .unwrap_or(false))
    }
}

/// Generate a session token: `tok_` followed by 122 random bits in hex.
fn issue_token() -> String {
    format!("tok_{}", Uuid::new_v4().simple())
}
