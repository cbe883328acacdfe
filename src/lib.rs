//! A chat bot whose commands, replies and welcome flow are defined by a
//! remotely hosted bundle of YAML documents and reloaded at runtime.

pub mod bot;
pub mod bundle;
pub mod constants;
pub mod dispatch;
mod error;
pub mod event;
pub mod live;
pub mod platform;
pub mod settings;
pub mod template;

pub use bot::{Bot, BotBuilder};
pub use error::Error;
pub use platform::{DiscordRest, Platform};
pub use settings::{BotSettings, Settings, SettingsError};
