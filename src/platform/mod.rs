//! Outbound calls to the chat platform.

mod discord;
#[cfg(test)]
mod recording;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{InteractionTarget, Snowflake};
use crate::live::{ActionRow, CommandDefinition, Embed, InteractionDefinition};

pub use discord::DiscordRest;
#[cfg(test)]
pub(crate) use recording::{Call, RecordingPlatform};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatformError {
    #[error("request to {route} failed: {source}")]
    Http {
        route: String,
        source: reqwest::Error,
    },

    #[error("request to {route} returned {status}: {body}")]
    Status {
        route: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// A message ready to be sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    /// Only the invoking user sees it; meaningful for interaction replies.
    pub ephemeral: bool,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

impl From<InteractionDefinition> for OutboundMessage {
    fn from(definition: InteractionDefinition) -> Self {
        Self {
            content: definition.content,
            embeds: definition.embeds,
            components: definition.components,
            ephemeral: definition.ephemeral,
        }
    }
}

/// The operations the bot needs from the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn login(&self) -> Result<(), PlatformError>;

    /// Replaces the guild's command list with `commands`.
    async fn put_guild_commands(
        &self,
        guild_id: Snowflake,
        commands: &[CommandDefinition],
    ) -> Result<(), PlatformError>;

    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError>;

    /// Initial response to an interaction.
    async fn reply(
        &self,
        target: &InteractionTarget,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError>;

    /// Additional response after the initial one.
    async fn follow_up(
        &self,
        target: &InteractionTarget,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError>;

    async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), PlatformError>;

    async fn set_auto_archive_duration(
        &self,
        thread_id: Snowflake,
        minutes: u32,
    ) -> Result<(), PlatformError>;

    /// Tears the client down; nothing is sent after this.
    async fn destroy(&self);
}
