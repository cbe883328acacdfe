//! Definitions loaded from the extracted bundle.
//!
//! One load cycle produces a [`Snapshot`]. Snapshots are never mutated: a
//! reload builds a new one and swaps it into the [`SnapshotStore`], so
//! handlers still holding the previous snapshot keep a consistent view.

mod command;
mod config;
mod interaction;
mod loader;
mod trigger;

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

pub use command::{Choice, ChoiceValue, CommandDefinition, LiveCommands, OptionDefinition, Reply};
pub use config::{
    has_permission, LiveConfig, Modules, PermissionRule, VerificationButton,
    VerificationInteractions, VerificationModule,
};
pub use interaction::{
    ActionRow, Button, ButtonStyle, Component, Embed, EmbedField, InteractionDefinition,
    LiveInteractions, SelectMenu, SelectOption,
};
pub use loader::{load_commands, load_config, load_constants, load_interactions, load_triggers};
pub use trigger::{LiveTriggers, Trigger, TriggerDefinition};

use crate::constants::StaticConstants;

/// Everything one load of the bundle produced.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Zero for the empty snapshot in place before the first load.
    pub version: u64,
    pub constants: StaticConstants,
    pub config: LiveConfig,
    pub commands: LiveCommands,
    pub interactions: LiveInteractions,
    pub triggers: LiveTriggers,
}

impl Snapshot {
    /// Loads every part from the bundle rooted at `root`. Static constants
    /// are loaded first and substituted into all other documents.
    pub fn load(root: &Path, version: u64) -> Self {
        let constants = load_constants(root);
        let config = load_config(root, &constants);
        let commands = load_commands(root, &constants);
        let interactions = load_interactions(root, &constants);
        let triggers = load_triggers(root, &constants);

        info!(
            version,
            root = %root.display(),
            constants = constants.tree().len(),
            commands = commands.len(),
            interactions = interactions.len(),
            triggers = triggers.len(),
            "loaded bundle snapshot"
        );

        Self {
            version,
            constants,
            config,
            commands,
            interactions,
            triggers,
        }
    }
}

/// Holds the current snapshot; readers never block a reload.
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Starts with an empty snapshot at version 0.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn next_version(&self) -> u64 {
        self.current.load().version + 1
    }

    /// Swaps in a new snapshot, returning the one it replaced.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.current.swap(Arc::new(snapshot))
    }
}
