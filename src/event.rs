//! Platform-agnostic view of the gateway events the bot reacts to.
//!
//! A gateway client translates its wire events into these types and feeds
//! them to [`Bot::run`](crate::Bot::run).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const CDN_BASE: &str = "https://cdn.discordapp.com";

/// A platform identifier (user, role, channel, guild, message, ...).
///
/// Deserializes from either an integer or a decimal string, since settings
/// coming from the environment and YAML documents use both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(Self(id)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid snowflake '{text}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    /// Legacy per-user tag; `"0"` for accounts migrated to unique usernames.
    pub discriminator: String,
    /// Avatar hash, `None` when the user has the default avatar.
    pub avatar: Option<String>,
    pub bot: bool,
}

impl User {
    /// Resolves the URL of the avatar the client would display.
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "webp" };
                format!("{CDN_BASE}/avatars/{}/{hash}.{ext}", self.id)
            }
            None => {
                let index = match self.discriminator.parse::<u64>() {
                    Ok(0) | Err(_) => (self.id.0 >> 22) % 6,
                    Ok(tag) => tag % 5,
                };
                format!("{CDN_BASE}/embed/avatars/{index}.png")
            }
        }
    }
}

/// A user in the context of a guild.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub guild_id: Snowflake,
    pub user: User,
    pub roles: Vec<Snowflake>,
}

impl Member {
    pub fn has_any_role(&self, roles: &[Snowflake]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }
}

/// Option types of an application command, with their wire discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
}

impl OptionKind {
    pub fn is_subcommand(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }
}

/// An option supplied with a command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub kind: OptionKind,
    pub value: Option<serde_json::Value>,
    /// Nested options of a subcommand or subcommand group.
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    pub fn value(name: impl Into<String>, kind: OptionKind, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            kind,
            value: Some(value),
            options: Vec::new(),
        }
    }

    pub fn subcommand(name: impl Into<String>, options: Vec<CommandOption>) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::SubCommand,
            value: None,
            options,
        }
    }

    pub fn group(name: impl Into<String>, subcommand: CommandOption) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::SubCommandGroup,
            value: None,
            options: vec![subcommand],
        }
    }
}

/// Identifies an interaction for responding to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionTarget {
    pub id: Snowflake,
    pub token: String,
}

/// A slash command (or its autocomplete request).
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub target: InteractionTarget,
    pub name: String,
    pub options: Vec<CommandOption>,
    pub user: User,
    pub member: Option<Member>,
    pub channel_id: Snowflake,
}

impl CommandInvocation {
    /// Name of the invoked subcommand, looking through a subcommand group.
    pub fn subcommand(&self) -> Option<&str> {
        let first = self.options.first()?;
        match first.kind {
            OptionKind::SubCommand => Some(&first.name),
            OptionKind::SubCommandGroup => first
                .options
                .iter()
                .find(|option| option.kind == OptionKind::SubCommand)
                .map(|option| option.name.as_str()),
            _ => None,
        }
    }

    /// Dot-joined `command` or `command.subcommand` path, the key of
    /// permission rules.
    pub fn command_path(&self) -> String {
        match self.subcommand() {
            Some(sub) => format!("{}.{sub}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A button press or select menu choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInvocation {
    pub target: InteractionTarget,
    pub custom_id: String,
    /// Selected values for select menus, empty for buttons.
    pub values: Vec<String>,
    pub user: User,
    pub member: Option<Member>,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Command(CommandInvocation),
    Autocomplete(CommandInvocation),
    Component(ComponentInvocation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub content: String,
    pub author: User,
    pub member: Option<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: Snowflake,
    pub parent_id: Option<Snowflake>,
    pub archived: bool,
    pub auto_archive_minutes: u32,
}

/// Events delivered by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready,
    MemberJoin(Member),
    /// A new message; `thread` is set when it was posted inside a thread.
    MessageCreate {
        message: Message,
        thread: Option<Thread>,
    },
    InteractionCreate(Interaction),
    ThreadUpdate {
        old: Thread,
        new: Thread,
    },
    Error(String),
}
