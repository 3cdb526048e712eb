//! Name-keyed table of command descriptors.

use std::collections::HashMap;

use serde::Serialize;

use super::descriptor::CommandDescriptor;
use super::schema::ObjectSchema;
use super::{auth, builtin};
use crate::error::RelayError;
use crate::Result;

/// Public description of a registered command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub schema: ObjectSchema,
}

/// Registered commands, looked up by name.
///
/// Built once at startup. Registration order is kept only for listing;
/// routing is by name.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDescriptor>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module's commands plus the session lifecycle built-ins.
    pub fn standard() -> Result<Self> {
        Self::from_groups([auth::commands(), builtin::commands()])
    }

    /// Build a registry by concatenating descriptor lists.
    ///
    /// Fails on the first name that appears twice.
    pub fn from_groups<I>(groups: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<CommandDescriptor>>,
    {
        let mut registry = Self::new();
        for descriptor in groups.into_iter().flatten() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Add a descriptor. Names must be unique.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<()> {
        let name = descriptor.name();
        if self.commands.contains_key(name) {
            return Err(RelayError::DuplicateCommand(name.to_string()));
        }
        self.commands.insert(name, descriptor);
        self.order.push(name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Command names in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    /// Name and schema of every command, in registration order.
    pub fn describe(&self) -> Vec<CommandInfo> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .map(|d| CommandInfo {
                name: d.name(),
                schema: d.schema().clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
