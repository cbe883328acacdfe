//! Locally implemented commands and component handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::{CommandInvocation, ComponentInvocation};
use crate::live::{CommandDefinition, Snapshot};
use crate::platform::Platform;

/// What a command handler gets to work with.
pub struct CommandContext<'a> {
    pub invocation: &'a CommandInvocation,
    pub snapshot: &'a Snapshot,
    pub platform: &'a dyn Platform,
}

pub struct ComponentContext<'a> {
    pub invocation: &'a ComponentInvocation,
    pub snapshot: &'a Snapshot,
    pub platform: &'a dyn Platform,
}

#[async_trait]
pub trait ExecuteCommand: Send + Sync {
    async fn execute(&self, ctx: CommandContext<'_>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AutocompleteCommand: Send + Sync {
    async fn autocomplete(&self, ctx: CommandContext<'_>) -> anyhow::Result<()>;
}

/// Handles button presses and menu selections for one custom id.
#[async_trait]
pub trait ComponentHandler: Send + Sync {
    async fn execute(&self, ctx: ComponentContext<'_>) -> anyhow::Result<()>;
}

/// The capabilities a local command provides.
#[derive(Clone)]
pub enum CommandHandler {
    Executable(Arc<dyn ExecuteCommand>),
    Autocompletable(Arc<dyn AutocompleteCommand>),
    Both {
        execute: Arc<dyn ExecuteCommand>,
        autocomplete: Arc<dyn AutocompleteCommand>,
    },
}

impl CommandHandler {
    pub fn executor(&self) -> Option<&dyn ExecuteCommand> {
        match self {
            Self::Executable(execute) | Self::Both { execute, .. } => Some(&**execute),
            Self::Autocompletable(_) => None,
        }
    }

    pub fn autocompleter(&self) -> Option<&dyn AutocompleteCommand> {
        match self {
            Self::Autocompletable(autocomplete) | Self::Both { autocomplete, .. } => {
                Some(&**autocomplete)
            }
            Self::Executable(_) => None,
        }
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Executable(_) => "Executable",
            Self::Autocompletable(_) => "Autocompletable",
            Self::Both { .. } => "Both",
        };
        f.debug_tuple("CommandHandler").field(&kind).finish()
    }
}

#[derive(Debug, Clone)]
struct LocalCommand {
    definition: CommandDefinition,
    handler: CommandHandler,
}

/// Commands implemented in code, in registration order.
#[derive(Debug, Clone, Default)]
pub struct LocalCommands {
    commands: Vec<LocalCommand>,
}

impl LocalCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command; a later registration under the same name wins.
    pub fn register(&mut self, definition: CommandDefinition, handler: CommandHandler) {
        self.commands.retain(|c| c.definition.name != definition.name);
        self.commands.push(LocalCommand {
            definition,
            handler,
        });
    }

    pub fn resolve(&self, name: &str) -> Option<&CommandHandler> {
        self.commands
            .iter()
            .find(|c| c.definition.name == name)
            .map(|c| &c.handler)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.iter().map(|c| &c.definition)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Component handlers keyed by custom id.
#[derive(Clone, Default)]
pub struct LocalInteractions {
    handlers: HashMap<String, Arc<dyn ComponentHandler>>,
}

impl LocalInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, custom_id: impl Into<String>, handler: Arc<dyn ComponentHandler>) {
        self.handlers.insert(custom_id.into(), handler);
    }

    pub fn resolve(&self, custom_id: &str) -> Option<&dyn ComponentHandler> {
        self.handlers.get(custom_id).map(|handler| &**handler)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for LocalInteractions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("LocalInteractions").field("ids", &ids).finish()
    }
}
