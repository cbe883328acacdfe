//! The bot runtime: owns the current snapshot and turns events into
//! platform calls.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::bundle::{refresh_bundle, BundleError, BundleSource, HttpSource};
use crate::dispatch::{
    CommandHandler, ComponentHandler, DispatchError, Dispatcher, LocalCommands, LocalInteractions,
};
use crate::event::{Event, Interaction};
use crate::live::{CommandDefinition, Snapshot, SnapshotStore};
use crate::platform::{OutboundMessage, Platform, PlatformError};
use crate::settings::BotSettings;
use crate::Error;

/// A running bot: settings, the platform client, the bundle source and the
/// current snapshot of live definitions.
///
/// ```no_run
/// use std::sync::Arc;
/// use livebot::{Bot, BotSettings, DiscordRest};
///
/// # async fn run() -> Result<(), livebot::Error> {
/// let settings = BotSettings::load(None)?;
/// let platform = DiscordRest::new(&settings.discord.token, settings.discord.application_id);
/// let bot = Bot::builder()
///     .with_settings(settings)
///     .with_platform(Arc::new(platform))
///     .build()?;
/// bot.initialize().await?;
/// # Ok(())
/// # }
/// ```
pub struct Bot {
    settings: BotSettings,
    platform: Arc<dyn Platform>,
    source: Box<dyn BundleSource>,
    store: SnapshotStore,
    local_commands: LocalCommands,
    local_interactions: LocalInteractions,
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("settings", &self.settings)
            .field("source", &self.source)
            .field("version", &self.store.current().version)
            .field("local_commands", &self.local_commands)
            .field("local_interactions", &self.local_interactions)
            .finish_non_exhaustive()
    }
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// The snapshot currently in effect.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// Loads the bundle and registers commands, then logs in.
    ///
    /// On failure the bot still logs in so the error can be reported to the
    /// internal log channel, then the platform client is destroyed and the
    /// error returned.
    pub async fn initialize(&self) -> Result<(), Error> {
        let result = async {
            self.reload().await?;
            self.platform.login().await?;
            Ok::<_, Error>(())
        }
        .await;

        if let Err(e) = result {
            error!(error = %e, "initialization failed");
            if let Err(login) = self.platform.login().await {
                warn!(error = %login, "re-login after failed initialization failed");
            }
            self.log_internal_error(&e).await;
            self.platform.destroy().await;
            return Err(e);
        }
        Ok(())
    }

    /// Fetches a fresh bundle, swaps in the snapshot loaded from it and
    /// re-registers commands.
    ///
    /// A failed fetch or extraction keeps the current snapshot in effect.
    pub async fn reload(&self) -> Result<Arc<Snapshot>, Error> {
        let dest = &self.settings.bundle.extract_dir;
        let folder = self.settings.bundle.root_folder.as_deref();
        let root = refresh_bundle(&*self.source, dest, folder).await?;
        let version = self.store.next_version();
        let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&root, version))
            .await
            .map_err(BundleError::from)?;
        self.store.replace(snapshot);

        self.register_commands().await?;
        Ok(self.store.current())
    }

    /// Reloads, reporting a failure to the internal log channel instead of
    /// returning it.
    pub async fn try_reload(&self) -> bool {
        match self.reload().await {
            Ok(snapshot) => {
                info!(version = snapshot.version, "reloaded live bundle");
                true
            }
            Err(e) => {
                self.log_internal_error(&e).await;
                false
            }
        }
    }

    /// Live definitions followed by local ones, de-duplicated by name.
    ///
    /// A later definition replaces an earlier one with the same name but
    /// keeps its position. Nameless definitions are skipped.
    pub fn command_definitions(&self, snapshot: &Snapshot) -> Vec<CommandDefinition> {
        let mut merged: Vec<CommandDefinition> = Vec::new();
        let all = snapshot
            .commands
            .definitions()
            .iter()
            .chain(self.local_commands.definitions());

        for definition in all {
            if definition.name.is_empty() {
                continue;
            }
            match merged.iter_mut().find(|d| d.name == definition.name) {
                Some(existing) => *existing = definition.clone(),
                None => merged.push(definition.clone()),
            }
        }
        merged
    }

    pub async fn register_commands(&self) -> Result<(), PlatformError> {
        let commands = self.command_definitions(&self.store.current());
        for command in &commands {
            info!(
                command = %command.name,
                autocomplete = command.autocomplete(),
                "registering command"
            );
        }
        self.put_commands(&commands).await
    }

    /// Removes every command from the target guild.
    pub async fn unload_commands(&self) -> Result<(), PlatformError> {
        self.put_commands(&[]).await
    }

    async fn put_commands(&self, commands: &[CommandDefinition]) -> Result<(), PlatformError> {
        let guild = self.settings.discord.target_guild(self.settings.dev_mode);
        self.platform.put_guild_commands(guild, commands).await?;
        info!(%guild, count = commands.len(), "registered commands");
        Ok(())
    }

    /// Handles events until the sender side closes, each in its own task.
    /// Returns once every spawned handler has finished.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<Event>) {
        let mut tasks = JoinSet::new();
        while let Some(event) = events.recv().await {
            let bot = Arc::clone(&self);
            tasks.spawn(async move { bot.handle_event(event).await });
            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
        info!("event stream closed");
    }

    /// Dispatches one event against the current snapshot.
    pub async fn handle_event(&self, event: Event) {
        let snapshot = self.store.current();
        let dispatcher = Dispatcher {
            snapshot: &snapshot,
            platform: &*self.platform,
            commands: &self.local_commands,
            interactions: &self.local_interactions,
            support_channel: self.settings.discord.support_channel,
        };

        let result = match &event {
            Event::Ready => {
                info!(version = snapshot.version, "ready");
                Ok(())
            }
            Event::MemberJoin(member) => dispatcher.member_join(member).await,
            Event::MessageCreate { message, thread } => {
                dispatcher.message(message, thread.as_ref()).await
            }
            Event::InteractionCreate(interaction) => dispatcher.interaction(interaction).await,
            Event::ThreadUpdate { old, new } => dispatcher.thread_update(old, new).await,
            Event::Error(message) => {
                self.log_internal_error(message).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report(&event, e).await;
        }
    }

    /// Command and component failures go back to the invoker; everything
    /// else to the internal log channel.
    async fn report(&self, event: &Event, error: DispatchError) {
        let target = match event {
            Event::InteractionCreate(Interaction::Command(invocation)) => Some(&invocation.target),
            Event::InteractionCreate(Interaction::Component(invocation)) => {
                Some(&invocation.target)
            }
            _ => None,
        };
        let Some(target) = target else {
            self.log_internal_error(&error).await;
            return;
        };

        warn!(error = %error, "interaction failed");
        let notice = OutboundMessage::text(format!("**ERROR**: {error}")).ephemeral();
        if let Err(e) = self.platform.follow_up(target, &notice).await {
            self.log_internal_error(&e).await;
        }
    }

    /// Logs `error` and posts it to the internal log channel, if configured.
    pub async fn log_internal_error(&self, error: &(dyn fmt::Display + Sync)) {
        error!(error = %error, "internal error");
        let Some(channel) = self.settings.discord.internal_log_channel else {
            return;
        };
        let message = OutboundMessage::text(format!("**INTERNAL UNHANDLED ERROR**\n{error}"));
        if let Err(e) = self.platform.send_message(channel, &message).await {
            warn!(error = %e, %channel, "failed to post to internal log channel");
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "event handler panicked");
    } else {
        debug!("event handled");
    }
}

/// Builder for [`Bot`].
#[derive(Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct BotBuilder {
    settings: Option<BotSettings>,
    platform: Option<Arc<dyn Platform>>,
    source: Option<Box<dyn BundleSource>>,
    local_commands: LocalCommands,
    local_interactions: LocalInteractions,
}

impl BotBuilder {
    pub fn with_settings(mut self, settings: BotSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Overrides where the bundle is fetched from. Defaults to an
    /// [`HttpSource`] for the configured bundle URL.
    pub fn with_source(mut self, source: impl BundleSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_command(mut self, definition: CommandDefinition, handler: CommandHandler) -> Self {
        self.local_commands.register(definition, handler);
        self
    }

    pub fn with_interaction(
        mut self,
        custom_id: impl Into<String>,
        handler: Arc<dyn ComponentHandler>,
    ) -> Self {
        self.local_interactions.register(custom_id, handler);
        self
    }

    /// Fails when settings or the platform client are missing.
    pub fn build(self) -> Result<Bot, Error> {
        let settings = self.settings.ok_or(Error::MissingSettings)?;
        let platform = self.platform.ok_or(Error::MissingPlatform)?;
        let source = self
            .source
            .unwrap_or_else(|| Box::new(HttpSource::new(settings.bundle.url.clone())));

        Ok(Bot {
            settings,
            platform,
            source,
            store: SnapshotStore::new(),
            local_commands: self.local_commands,
            local_interactions: self.local_interactions,
        })
    }
}
