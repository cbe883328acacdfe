use regex::Regex;
use serde::Deserialize;

use super::command::Reply;
use crate::event::{Message, Snowflake};

/// A message trigger as written in `triggers.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub pattern: String,
    pub reply: Reply,
    /// Channels the trigger listens in; empty means everywhere.
    #[serde(default)]
    pub channels: Vec<Snowflake>,
    #[serde(default)]
    pub include_bots: bool,
}

/// A trigger with its pattern compiled.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub pattern: Regex,
    pub reply: Reply,
    pub channels: Vec<Snowflake>,
    pub include_bots: bool,
}

impl Trigger {
    pub fn compile(definition: TriggerDefinition) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&definition.pattern)?;
        Ok(Self {
            name: definition.name.unwrap_or(definition.pattern),
            pattern,
            reply: definition.reply,
            channels: definition.channels,
            include_bots: definition.include_bots,
        })
    }

    pub fn matches(&self, message: &Message) -> bool {
        if message.author.bot && !self.include_bots {
            return false;
        }
        if !self.channels.is_empty() && !self.channels.contains(&message.channel_id) {
            return false;
        }
        self.pattern.is_match(&message.content)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LiveTriggers {
    triggers: Vec<Trigger>,
}

impl LiveTriggers {
    pub fn push(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    /// Triggers firing for `message`, in declaration order.
    pub fn matching<'a>(&'a self, message: &'a Message) -> impl Iterator<Item = &'a Trigger> + 'a {
        self.triggers.iter().filter(move |t| t.matches(message))
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::User;

    fn message(content: &str, channel: u64, bot: bool) -> Message {
        Message {
            id: Snowflake(1),
            channel_id: Snowflake(channel),
            content: content.into(),
            author: User {
                id: Snowflake(2),
                username: "u".into(),
                discriminator: "0".into(),
                avatar: None,
                bot,
            },
            member: None,
        }
    }

    fn trigger(yaml: &str) -> Trigger {
        Trigger::compile(serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_pattern_match() {
        let trigger = trigger("pattern: '(?i)\\bhelp\\b'\nreply: faq/help");
        assert_eq!(trigger.name, "(?i)\\bhelp\\b");
        assert!(trigger.matches(&message("I need HELP please", 5, false)));
        assert!(!trigger.matches(&message("helpful", 5, false)));
    }

    #[test]
    fn test_channel_filter() {
        let trigger = trigger("name: rules\npattern: rules\nreply: faq/rules\nchannels: [5, \"6\"]");
        assert!(trigger.matches(&message("rules?", 6, false)));
        assert!(!trigger.matches(&message("rules?", 7, false)));
    }

    #[test]
    fn test_bots_ignored_unless_included() {
        let ignoring = trigger("pattern: ping\nreply: pong");
        let including = trigger("pattern: ping\nreply: pong\ninclude_bots: true");
        assert!(!ignoring.matches(&message("ping", 1, true)));
        assert!(including.matches(&message("ping", 1, true)));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let definition: TriggerDefinition = serde_yaml::from_str("pattern: '('\nreply: x").unwrap();
        assert!(Trigger::compile(definition).is_err());
    }
}
