//! Routing of incoming events to local handlers and live definitions.
//!
//! A [`Dispatcher`] borrows one snapshot for the whole event, so a reload
//! finishing mid-event never mixes definitions from two bundles.

mod handler;
mod support;
mod welcome;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use handler::{
    AutocompleteCommand, CommandContext, CommandHandler, ComponentContext, ComponentHandler,
    ExecuteCommand, LocalCommands, LocalInteractions,
};
pub use support::{ARCHIVE_NOTICE, EXTENDED_ARCHIVE_MINUTES, SHORT_ARCHIVE_MINUTES};
pub use welcome::VERIFICATION_CUSTOM_ID;

use crate::constants::ContextConstants;
use crate::event::{CommandInvocation, ComponentInvocation, Interaction, Message, Snowflake};
use crate::live::{has_permission, InteractionDefinition, Reply, Snapshot};
use crate::platform::{OutboundMessage, Platform, PlatformError};

pub const PERMISSION_DENIED_NOTICE: &str = "You don't have permission to execute this command";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("permission denied for '{command}'")]
    PermissionDenied { command: String },

    #[error("no live interaction with id '{0}'")]
    UnknownInteraction(String),

    #[error("failed to render interaction: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Everything one event is dispatched against.
pub struct Dispatcher<'a> {
    pub snapshot: &'a Snapshot,
    pub platform: &'a dyn Platform,
    pub commands: &'a LocalCommands,
    pub interactions: &'a LocalInteractions,
    /// Forum channel whose threads get archive housekeeping.
    pub support_channel: Option<Snowflake>,
}

impl Dispatcher<'_> {
    pub async fn interaction(&self, interaction: &Interaction) -> Result<(), DispatchError> {
        match interaction {
            Interaction::Command(invocation) => match self.check_permission(invocation) {
                Err(DispatchError::PermissionDenied { command }) => {
                    info!(%command, user = %invocation.user.id, "permission denied");
                    let notice = OutboundMessage::text(PERMISSION_DENIED_NOTICE).ephemeral();
                    self.platform.reply(&invocation.target, &notice).await?;
                    Ok(())
                }
                Err(e) => Err(e),
                Ok(()) => self.command(invocation).await,
            },
            Interaction::Autocomplete(invocation) => match self.check_permission(invocation) {
                Err(DispatchError::PermissionDenied { command }) => {
                    debug!(%command, "dropping autocomplete without permission");
                    Ok(())
                }
                Err(e) => Err(e),
                Ok(()) => self.autocomplete(invocation).await,
            },
            Interaction::Component(invocation) => self.component(invocation).await,
        }
    }

    fn check_permission(&self, invocation: &CommandInvocation) -> Result<(), DispatchError> {
        let command = invocation.command_path();
        let rule = self.snapshot.config.permission(&command);
        if has_permission(rule, invocation.member.as_ref()) {
            Ok(())
        } else {
            Err(DispatchError::PermissionDenied { command })
        }
    }

    async fn command(&self, invocation: &CommandInvocation) -> Result<(), DispatchError> {
        if let Some(handler) = self.commands.resolve(&invocation.name) {
            let Some(executor) = handler.executor() else {
                debug!(command = %invocation.name, "local command is not executable");
                return Ok(());
            };
            executor.execute(self.command_context(invocation)).await?;
            return Ok(());
        }

        let Some(reply) = self
            .snapshot
            .commands
            .resolve(&invocation.name, invocation.subcommand())
        else {
            debug!(command = %invocation.command_path(), "no handler for command");
            return Ok(());
        };

        let definition = self.reply_definition(reply)?;
        let rendered = definition.render(&ContextConstants::build(invocation))?;
        self.platform
            .reply(&invocation.target, &OutboundMessage::from(rendered))
            .await?;
        Ok(())
    }

    async fn autocomplete(&self, invocation: &CommandInvocation) -> Result<(), DispatchError> {
        let Some(completer) = self
            .commands
            .resolve(&invocation.name)
            .and_then(CommandHandler::autocompleter)
        else {
            debug!(command = %invocation.name, "no autocomplete handler");
            return Ok(());
        };
        completer.autocomplete(self.command_context(invocation)).await?;
        Ok(())
    }

    async fn component(&self, invocation: &ComponentInvocation) -> Result<(), DispatchError> {
        let Some(handler) = self.interactions.resolve(&invocation.custom_id) else {
            debug!(custom_id = %invocation.custom_id, "no handler for component");
            return Ok(());
        };
        handler
            .execute(ComponentContext {
                invocation,
                snapshot: self.snapshot,
                platform: self.platform,
            })
            .await?;
        Ok(())
    }

    /// Replies to every live trigger matching `message` in its channel.
    /// Fires every matching trigger. A failing trigger is logged and does
    /// not stop the others; the first failure is returned.
    pub async fn triggers(&self, message: &Message) -> Result<(), DispatchError> {
        let mut first_error = None;
        for trigger in self.snapshot.triggers.matching(message) {
            debug!(trigger = %trigger.name, message = %message.id, "trigger matched");
            if let Err(e) = self.fire_trigger(&trigger.reply, message).await {
                warn!(trigger = %trigger.name, error = %e, "trigger failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn fire_trigger(&self, reply: &Reply, message: &Message) -> Result<(), DispatchError> {
        let definition = self.reply_definition(reply)?;
        let rendered = definition.render(&ContextConstants::build(message))?;
        self.platform
            .send_message(message.channel_id, &OutboundMessage::from(rendered))
            .await?;
        Ok(())
    }

    fn command_context<'b>(&'b self, invocation: &'b CommandInvocation) -> CommandContext<'b> {
        CommandContext {
            invocation,
            snapshot: self.snapshot,
            platform: self.platform,
        }
    }

    fn reply_definition<'b>(
        &'b self,
        reply: &'b Reply,
    ) -> Result<&'b InteractionDefinition, DispatchError> {
        match reply {
            Reply::Interaction(id) => self
                .snapshot
                .interactions
                .get(id)
                .ok_or_else(|| DispatchError::UnknownInteraction(id.clone())),
            Reply::Inline(definition) => Ok(definition),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::event::{CommandOption, InteractionTarget, Member, OptionKind, Thread, User};
    use crate::live::{CommandDefinition, LiveConfig, Trigger, TriggerDefinition};
    use crate::platform::{Call, RecordingPlatform};

    const MOD_ROLE: Snowflake = Snowflake(900);
    const SUPPORT: Snowflake = Snowflake(700);

    fn user(bot: bool) -> User {
        User {
            id: Snowflake(42),
            username: "nelly".into(),
            discriminator: "0".into(),
            avatar: None,
            bot,
        }
    }

    fn member(roles: Vec<Snowflake>) -> Member {
        Member {
            guild_id: Snowflake(1),
            user: user(false),
            roles,
        }
    }

    fn invocation(name: &str, options: Vec<CommandOption>, roles: Vec<Snowflake>) -> CommandInvocation {
        CommandInvocation {
            target: InteractionTarget {
                id: Snowflake(10),
                token: "tok".into(),
            },
            name: name.into(),
            options,
            user: user(false),
            member: Some(member(roles)),
            channel_id: Snowflake(20),
        }
    }

    fn message(content: &str, bot: bool, channel_id: Snowflake) -> Message {
        Message {
            id: Snowflake(30),
            channel_id,
            content: content.into(),
            author: user(bot),
            member: None,
        }
    }

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot {
            config: serde_yaml::from_str::<LiveConfig>(
                "permissions:\n  admin.reload:\n    whitelist: ['900']",
            )
            .unwrap(),
            ..Snapshot::default()
        };
        snapshot.commands.push(
            serde_yaml::from_str(
                "name: roll\nreply:\n  content: \"You chose {{@OPTIONS.COUNT}}\"\n  ephemeral: true",
            )
            .unwrap(),
        );
        snapshot.commands.push(
            serde_yaml::from_str(
                "name: admin\noptions:\n  - name: reload\n    type: SUB_COMMAND\n    reply: reloaded",
            )
            .unwrap(),
        );
        snapshot.commands.push(serde_yaml::from_str("name: ghost\nreply: missing").unwrap());
        snapshot.interactions.insert(
            "reloaded",
            InteractionDefinition {
                content: Some("Reloaded by {{@USER.USERNAME}}".into()),
                ..InteractionDefinition::default()
            },
        );
        snapshot
    }

    struct Counter(AtomicUsize);

    #[async_trait]
    impl ExecuteCommand for Counter {
        async fn execute(&self, ctx: CommandContext<'_>) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            ctx.platform
                .reply(&ctx.invocation.target, &OutboundMessage::text("local"))
                .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl ComponentHandler for Counter {
        async fn execute(&self, _ctx: ComponentContext<'_>) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("component exploded")
        }
    }

    struct Fixture {
        snapshot: Snapshot,
        platform: RecordingPlatform,
        commands: LocalCommands,
        interactions: LocalInteractions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                snapshot: snapshot(),
                platform: RecordingPlatform::default(),
                commands: LocalCommands::new(),
                interactions: LocalInteractions::new(),
            }
        }

        fn dispatcher(&self) -> Dispatcher<'_> {
            Dispatcher {
                snapshot: &self.snapshot,
                platform: &self.platform,
                commands: &self.commands,
                interactions: &self.interactions,
                support_channel: Some(SUPPORT),
            }
        }
    }

    #[tokio::test]
    async fn test_permission_denied_replies_ephemerally() {
        let fixture = Fixture::new();
        let denied = invocation(
            "admin",
            vec![CommandOption::subcommand("reload", vec![])],
            vec![Snowflake(1)],
        );

        fixture
            .dispatcher()
            .interaction(&Interaction::Command(denied))
            .await
            .unwrap();

        assert_eq!(
            fixture.platform.calls(),
            vec![Call::Reply(
                Snowflake(10),
                OutboundMessage::text(PERMISSION_DENIED_NOTICE).ephemeral()
            )]
        );
    }

    #[tokio::test]
    async fn test_permitted_subcommand_renders_user() {
        let fixture = Fixture::new();
        let allowed = invocation(
            "admin",
            vec![CommandOption::subcommand("reload", vec![])],
            vec![MOD_ROLE],
        );

        fixture
            .dispatcher()
            .interaction(&Interaction::Command(allowed))
            .await
            .unwrap();

        assert_eq!(
            fixture.platform.calls(),
            vec![Call::Reply(Snowflake(10), OutboundMessage::text("Reloaded by nelly"))]
        );
    }

    #[tokio::test]
    async fn test_autocomplete_without_permission_is_dropped() {
        let fixture = Fixture::new();
        let denied = invocation(
            "admin",
            vec![CommandOption::subcommand("reload", vec![])],
            vec![],
        );

        fixture
            .dispatcher()
            .interaction(&Interaction::Autocomplete(denied))
            .await
            .unwrap();

        assert!(fixture.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_live_command_renders_options() {
        let fixture = Fixture::new();
        let roll = invocation(
            "roll",
            vec![CommandOption::value("count", OptionKind::Integer, json!(5))],
            vec![],
        );

        fixture
            .dispatcher()
            .interaction(&Interaction::Command(roll))
            .await
            .unwrap();

        assert_eq!(
            fixture.platform.calls(),
            vec![Call::Reply(
                Snowflake(10),
                OutboundMessage::text("You chose 5").ephemeral()
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_reply_interaction_is_an_error() {
        let fixture = Fixture::new();
        let result = fixture
            .dispatcher()
            .interaction(&Interaction::Command(invocation("ghost", vec![], vec![])))
            .await;

        assert!(matches!(result, Err(DispatchError::UnknownInteraction(id)) if id == "missing"));
        assert!(fixture.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_local_command_shadows_live() {
        let mut fixture = Fixture::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        fixture.commands.register(
            CommandDefinition::new("roll", "local roll"),
            CommandHandler::Executable(counter.clone()),
        );

        fixture
            .dispatcher()
            .interaction(&Interaction::Command(invocation("roll", vec![], vec![])))
            .await
            .unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(
            fixture.platform.calls(),
            vec![Call::Reply(Snowflake(10), OutboundMessage::text("local"))]
        );
    }

    #[tokio::test]
    async fn test_component_resolves_local_handlers_only() {
        let mut fixture = Fixture::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        fixture.interactions.register("press", counter.clone());

        let press = |custom_id: &str| {
            Interaction::Component(ComponentInvocation {
                target: InteractionTarget {
                    id: Snowflake(11),
                    token: "tok".into(),
                },
                custom_id: custom_id.into(),
                values: vec![],
                user: user(false),
                member: None,
                channel_id: Snowflake(20),
                message_id: Snowflake(21),
            })
        };

        // live interaction ids are not component handlers
        fixture.dispatcher().interaction(&press("reloaded")).await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        let result = fixture.dispatcher().interaction(&press("press")).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(DispatchError::Handler(e)) if e.to_string() == "component exploded"));
    }

    #[tokio::test]
    async fn test_triggers_reply_in_channel() {
        let mut fixture = Fixture::new();
        fixture.snapshot.triggers.push(
            Trigger::compile(TriggerDefinition {
                name: None,
                pattern: "(?i)^hello".into(),
                reply: Reply::Inline(Box::new(InteractionDefinition {
                    content: Some("Hi {{@USER.USERNAME}}".into()),
                    ..InteractionDefinition::default()
                })),
                channels: vec![],
                include_bots: false,
            })
            .unwrap(),
        );
        let dispatcher = fixture.dispatcher();

        dispatcher.message(&message("Hello there", false, Snowflake(5)), None).await.unwrap();
        dispatcher.message(&message("Hello from a bot", true, Snowflake(5)), None).await.unwrap();
        dispatcher.message(&message("goodbye", false, Snowflake(5)), None).await.unwrap();

        assert_eq!(
            fixture.platform.calls(),
            vec![Call::SendMessage(Snowflake(5), OutboundMessage::text("Hi nelly"))]
        );
    }

    fn trigger(pattern: &str, reply: Reply) -> Trigger {
        Trigger::compile(TriggerDefinition {
            name: None,
            pattern: pattern.into(),
            reply,
            channels: vec![],
            include_bots: false,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_broken_trigger_does_not_stop_the_rest() {
        let mut fixture = Fixture::new();
        fixture
            .snapshot
            .triggers
            .push(trigger(".*", Reply::Interaction("does/not/exist".into())));
        fixture.snapshot.triggers.push(trigger(
            "help",
            Reply::Inline(Box::new(InteractionDefinition {
                content: Some("On it".into()),
                ..InteractionDefinition::default()
            })),
        ));
        let dispatcher = fixture.dispatcher();

        let result = dispatcher
            .message(&message("help!", false, Snowflake(800)), Some(&thread(SUPPORT, false, 60)))
            .await;

        assert!(matches!(result, Err(DispatchError::UnknownInteraction(id)) if id == "does/not/exist"));
        assert_eq!(
            fixture.platform.calls(),
            vec![
                Call::SendMessage(Snowflake(800), OutboundMessage::text("On it")),
                Call::SendMessage(Snowflake(800), OutboundMessage::text(ARCHIVE_NOTICE)),
                Call::SetAutoArchive(Snowflake(800), EXTENDED_ARCHIVE_MINUTES),
            ]
        );
    }

    fn thread(parent: Snowflake, archived: bool, minutes: u32) -> Thread {
        Thread {
            id: Snowflake(800),
            parent_id: Some(parent),
            archived,
            auto_archive_minutes: minutes,
        }
    }

    #[tokio::test]
    async fn test_support_thread_activity_extends_archive() {
        let fixture = Fixture::new();
        let dispatcher = fixture.dispatcher();
        let in_thread = message("help!", false, Snowflake(800));

        dispatcher
            .message(&in_thread, Some(&thread(SUPPORT, false, 60)))
            .await
            .unwrap();
        // already extended, other forum, bot author: untouched
        dispatcher
            .message(&in_thread, Some(&thread(SUPPORT, false, 1440)))
            .await
            .unwrap();
        dispatcher
            .message(&in_thread, Some(&thread(Snowflake(1), false, 60)))
            .await
            .unwrap();
        dispatcher
            .message(&message("bot", true, Snowflake(800)), Some(&thread(SUPPORT, false, 60)))
            .await
            .unwrap();

        assert_eq!(
            fixture.platform.calls(),
            vec![
                Call::SendMessage(Snowflake(800), OutboundMessage::text(ARCHIVE_NOTICE)),
                Call::SetAutoArchive(Snowflake(800), EXTENDED_ARCHIVE_MINUTES),
            ]
        );
    }

    #[tokio::test]
    async fn test_archived_support_thread_loses_starter_message() {
        let fixture = Fixture::new();
        let dispatcher = fixture.dispatcher();

        dispatcher
            .thread_update(&thread(SUPPORT, false, 60), &thread(SUPPORT, true, 60))
            .await
            .unwrap();
        dispatcher
            .thread_update(&thread(SUPPORT, true, 60), &thread(SUPPORT, true, 60))
            .await
            .unwrap();
        dispatcher
            .thread_update(&thread(Snowflake(1), false, 60), &thread(Snowflake(1), true, 60))
            .await
            .unwrap();

        assert_eq!(
            fixture.platform.calls(),
            vec![Call::DeleteMessage(SUPPORT, Snowflake(800))]
        );
    }

    fn with_verification(config: &str) -> Fixture {
        let mut fixture = Fixture::new();
        fixture.snapshot.config = serde_yaml::from_str(config).unwrap();
        fixture.snapshot.interactions.insert(
            "welcome",
            InteractionDefinition {
                content: Some("Welcome {{@USER.USERNAME}}".into()),
                ..InteractionDefinition::default()
            },
        );
        fixture
    }

    #[tokio::test]
    async fn test_member_join_sends_welcome_with_button() {
        let fixture = with_verification(
            "modules:\n  verification:\n    enabled: true\n    welcomeChannel: '55'\n    interactions:\n      initialMessageInteractionPath: welcome",
        );
        fixture.dispatcher().member_join(&member(vec![])).await.unwrap();

        let calls = fixture.platform.calls();
        let [Call::SendMessage(channel, sent)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(*channel, Snowflake(55));
        assert_eq!(sent.content.as_deref(), Some("Welcome nelly"));
        assert_eq!(sent.components.len(), 1);
    }

    #[tokio::test]
    async fn test_member_join_reports_missing_interaction() {
        let unset = with_verification(
            "modules:\n  verification:\n    enabled: true\n    welcomeChannel: '55'",
        );
        unset.dispatcher().member_join(&member(vec![])).await.unwrap();
        assert_eq!(
            unset.platform.calls(),
            vec![Call::SendMessage(
                Snowflake(55),
                OutboundMessage::text("**ERROR:** `interactions.initial_message` not set")
            )]
        );

        let unknown = with_verification(
            "modules:\n  verification:\n    enabled: true\n    welcomeChannel: '55'\n    interactions:\n      initialMessageInteractionPath: nope",
        );
        unknown.dispatcher().member_join(&member(vec![])).await.unwrap();
        assert_eq!(
            unknown.platform.calls(),
            vec![Call::SendMessage(
                Snowflake(55),
                OutboundMessage::text("**ERROR:** Unable to parse live interaction for id nope")
            )]
        );
    }

    #[tokio::test]
    async fn test_member_join_disabled_module_is_silent() {
        let fixture = with_verification(
            "modules:\n  verification:\n    enabled: false\n    welcomeChannel: '55'\n    interactions:\n      initialMessageInteractionPath: welcome",
        );
        fixture.dispatcher().member_join(&member(vec![])).await.unwrap();
        assert!(fixture.platform.calls().is_empty());
    }
}
