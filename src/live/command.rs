use serde::{Deserialize, Serialize};

use super::interaction::InteractionDefinition;
use crate::event::OptionKind;

/// What a live command or trigger answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Id of an interaction in the bundle's `interactions/` folder.
    Interaction(String),
    Inline(Box<InteractionDefinition>),
}

/// A slash command declared in the bundle (or by a local handler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            reply: None,
        }
    }

    /// Whether any option of this command asks for autocompletion.
    pub fn autocomplete(&self) -> bool {
        fn any(options: &[OptionDefinition]) -> bool {
            options.iter().any(|o| o.autocomplete || any(&o.options))
        }
        any(&self.options)
    }

    /// The reply for the command itself, or for one of its subcommands
    /// (looking inside subcommand groups).
    pub fn reply_for(&self, subcommand: Option<&str>) -> Option<&Reply> {
        match subcommand {
            None => self.reply.as_ref(),
            Some(name) => find_subcommand(&self.options, name)?.reply.as_ref(),
        }
    }
}

fn find_subcommand<'a>(options: &'a [OptionDefinition], name: &str) -> Option<&'a OptionDefinition> {
    options.iter().find_map(|option| match option.kind {
        OptionKind::SubCommand if option.name == name => Some(option),
        OptionKind::SubCommandGroup => find_subcommand(&option.options, name),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Options of a subcommand, or subcommands of a group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDefinition>,
    /// Only meaningful on subcommands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

/// Command definitions of one snapshot, in bundle order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveCommands {
    definitions: Vec<CommandDefinition>,
}

impl LiveCommands {
    pub fn push(&mut self, definition: CommandDefinition) {
        self.definitions.push(definition);
    }

    /// The definition registered under `name`; the last one wins when a
    /// name is declared twice, like on registration.
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.definitions.iter().rev().find(|d| d.name == name)
    }

    /// Resolves the reply of `name` / `subcommand`.
    pub fn resolve(&self, name: &str, subcommand: Option<&str>) -> Option<&Reply> {
        self.get(name)?.reply_for(subcommand)
    }

    pub fn definitions(&self) -> &[CommandDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
