//! Data/storage collaborator consumed by command handlers.
//!
//! Credential checks, token issuance and user persistence live behind the
//! [`DataSource`] trait. Handlers never interpret its failures: a
//! [`CollaboratorError`] reaches the caller exactly as the backend raised it.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{MemoryDataSource, SeedUser};

/// Failures raised by a data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Unknown user or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A user with this ID already exists.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// The CAPTCHA token was rejected.
    #[error("invalid captcha token")]
    InvalidCaptcha,

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Authentication and user storage backend.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Check credentials and issue a session token for `id`.
    async fn login(
        &self,
        id: &str,
        password: &str,
        captcha_token: &str,
    ) -> Result<String, CollaboratorError>;

    /// Create a new user.
    async fn add_user(
        &self,
        id: &str,
        password: &str,
        permissions: &str,
        captcha_token: &str,
    ) -> Result<(), CollaboratorError>;

    /// Whether `token` is a live token for `user_id`.
    async fn verify_token(&self, user_id: &str, token: &str) -> Result<bool, CollaboratorError>;
}
