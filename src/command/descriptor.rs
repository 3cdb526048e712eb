//! The uniform command contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::schema::{ObjectSchema, ValidationError};
use crate::datasource::DataSource;
use crate::error::RelayError;
use crate::session::{SessionId, SessionIdentities, SessionStore};
use crate::Result;

/// What a command body produces: a result object, or `None` for a void
/// success.
pub type CommandOutput = Option<Value>;

type ExecuteFn = dyn Fn(Value, CommandContext) -> BoxFuture<'static, Result<CommandOutput>>
    + Send
    + Sync;

/// Collaborators handed to every command body.
#[derive(Clone)]
pub struct CommandContext {
    /// Session the command was issued on, as supplied by the transport.
    pub session_id: SessionId,
    pub data_source: Arc<dyn DataSource>,
    pub identities: Arc<SessionIdentities>,
    pub sessions: Arc<SessionStore>,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// A named command: payload schema plus body.
///
/// Every command, whatever its domain, is one of these. The router only
/// ever calls [`CommandDescriptor::invoke`].
#[derive(Clone)]
pub struct CommandDescriptor {
    name: &'static str,
    schema: ObjectSchema,
    execute: Arc<ExecuteFn>,
}

impl CommandDescriptor {
    /// Build a descriptor from a name, a schema and a typed body.
    ///
    /// The body receives the payload decoded into `I` only after it has
    /// passed `schema`.
    pub fn new<I, F, Fut>(name: &'static str, schema: ObjectSchema, body: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        F: Fn(I, CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CommandOutput>> + Send + 'static,
    {
        let execute = move |raw: Value, ctx: CommandContext| -> BoxFuture<'static, Result<CommandOutput>> {
            match serde_json::from_value::<I>(raw) {
                Ok(input) => Box::pin(body(input, ctx)),
                Err(e) => Box::pin(future::ready(Err(RelayError::Validation {
                    command: name.to_string(),
                    source: ValidationError::Malformed(e.to_string()),
                }))),
            }
        };

        Self {
            name,
            schema,
            execute: Arc::new(execute),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    /// Validate `payload` and, if it conforms, run the body.
    pub async fn invoke(&self, payload: Value, ctx: CommandContext) -> Result<CommandOutput> {
        self.schema
            .validate(&payload)
            .map_err(|source| RelayError::Validation {
                command: self.name.to_string(),
                source,
            })?;

        (self.execute)(payload, ctx).await
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
