//! Exposed-name → descriptor registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connector::{ConnectError, TransformedCommand};
use crate::manifest::{resolve, LookupMode, ManifestCategory};

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<TransformedCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: TransformedCommand) -> Result<(), ConnectError> {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) {
            return Err(ConnectError::DuplicateName(name));
        }
        self.commands.insert(name, Arc::new(command));
        Ok(())
    }

    /// Exact exposed name.
    pub fn get(&self, name: &str) -> Option<&Arc<TransformedCommand>> {
        self.commands.get(name)
    }

    pub fn lookup(&self, name: &str, mode: LookupMode) -> Option<&Arc<TransformedCommand>> {
        let names = self.commands.keys().map(|k| (ManifestCategory::Command, k.as_str()));
        let (_, found) = resolve(names, name, mode)?;
        self.commands.get(found)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransformedCommand> {
        self.commands.values().map(Arc::as_ref)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
