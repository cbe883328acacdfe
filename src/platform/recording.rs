//! In-memory [`Platform`] that records every call, for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{OutboundMessage, Platform, PlatformError};
use crate::event::{InteractionTarget, Snowflake};
use crate::live::CommandDefinition;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Login,
    PutGuildCommands(Snowflake, Vec<String>),
    SendMessage(Snowflake, OutboundMessage),
    Reply(Snowflake, OutboundMessage),
    FollowUp(Snowflake, OutboundMessage),
    DeleteMessage(Snowflake, Snowflake),
    SetAutoArchive(Snowflake, u32),
    Destroy,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingPlatform {
    calls: Mutex<Vec<Call>>,
}

impl RecordingPlatform {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn login(&self) -> Result<(), PlatformError> {
        self.record(Call::Login)
    }

    async fn put_guild_commands(
        &self,
        guild_id: Snowflake,
        commands: &[CommandDefinition],
    ) -> Result<(), PlatformError> {
        let names = commands.iter().map(|c| c.name.clone()).collect();
        self.record(Call::PutGuildCommands(guild_id, names))
    }

    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError> {
        self.record(Call::SendMessage(channel_id, message.clone()))
    }

    async fn reply(
        &self,
        target: &InteractionTarget,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError> {
        self.record(Call::Reply(target.id, message.clone()))
    }

    async fn follow_up(
        &self,
        target: &InteractionTarget,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError> {
        self.record(Call::FollowUp(target.id, message.clone()))
    }

    async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), PlatformError> {
        self.record(Call::DeleteMessage(channel_id, message_id))
    }

    async fn set_auto_archive_duration(
        &self,
        thread_id: Snowflake,
        minutes: u32,
    ) -> Result<(), PlatformError> {
        self.record(Call::SetAutoArchive(thread_id, minutes))
    }

    async fn destroy(&self) {
        self.calls.lock().unwrap().push(Call::Destroy);
    }
}
