//! Process settings: credentials, guild ids and where the bundle lives.
//!
//! Loaded once at startup from an optional TOML file overlaid with
//! `LIVEBOT__*` environment variables.

mod builder;
mod env;
mod error;
mod file;
mod source;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use builder::Settings;
pub use env::EnvSource;
pub use error::SettingsError;
pub use file::FileSource;
pub use source::{merge_at_path, SettingsEntry, SettingsSource};

use crate::event::Snowflake;

pub const ENV_PREFIX: &str = "LIVEBOT";
pub const ENV_SEPARATOR: &str = "__";
pub const DEFAULT_FILE: &str = "livebot.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    pub discord: DiscordSettings,
    pub bundle: BundleSettings,
    /// Registers commands against the development guild instead.
    #[serde(default)]
    pub dev_mode: bool,
}

#[derive(Clone, Deserialize)]
pub struct DiscordSettings {
    pub token: String,
    pub application_id: Snowflake,
    pub guild_id: Snowflake,
    #[serde(default)]
    pub dev_guild_id: Option<Snowflake>,
    /// Where unhandled errors are reported.
    #[serde(default)]
    pub internal_log_channel: Option<Snowflake>,
    /// Forum channel whose threads get archive housekeeping.
    #[serde(default)]
    pub support_channel: Option<Snowflake>,
}

impl std::fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("guild_id", &self.guild_id)
            .field("dev_guild_id", &self.dev_guild_id)
            .field("internal_log_channel", &self.internal_log_channel)
            .field("support_channel", &self.support_channel)
            .finish()
    }
}

impl DiscordSettings {
    /// The guild commands are registered against.
    pub fn target_guild(&self, dev_mode: bool) -> Snowflake {
        match (dev_mode, self.dev_guild_id) {
            (true, Some(dev)) => dev,
            _ => self.guild_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleSettings {
    /// Archive download URL.
    pub url: String,
    #[serde(default = "default_extract_dir")]
    pub extract_dir: PathBuf,
    /// Folder inside the archive holding the bundle, when it is wrapped.
    #[serde(default)]
    pub root_folder: Option<String>,
}

fn default_extract_dir() -> PathBuf {
    PathBuf::from("live")
}

impl BotSettings {
    /// Loads from `path` (required) or, when absent, from
    /// [`DEFAULT_FILE`] if it exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let builder = match path {
            Some(path) => Settings::builder().with_file(path, true),
            None => Settings::builder().with_file(DEFAULT_FILE, false),
        };
        builder.with_env(ENV_PREFIX, ENV_SEPARATOR).build()
    }
}
