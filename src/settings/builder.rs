use std::path::Path;

use serde::de::DeserializeOwned;

use super::env::EnvSource;
use super::file::FileSource;
use super::source::{merge_at_path, SettingsSource};
use super::SettingsError;

/// Builder for layered settings.
///
/// Sources are merged in registration order, later ones overriding earlier
/// ones. Nested tables merge recursively; other values (including arrays)
/// are replaced entirely.
///
/// ```no_run
/// use livebot::settings::{BotSettings, Settings};
///
/// let settings: BotSettings = Settings::builder()
///     .with_file("livebot.toml", true)
///     .with_env("LIVEBOT", "__")
///     .build()?;
/// # Ok::<(), livebot::settings::SettingsError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Settings {
    sources: Vec<Box<dyn SettingsSource>>,
}

impl Settings {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a TOML file. A missing required file fails the build; a missing
    /// optional one is skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds environment variables named `{prefix}{separator}SECTION{separator}KEY`.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl SettingsSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Merges every source and deserializes the result.
    pub fn build<T: DeserializeOwned>(self) -> Result<T, SettingsError> {
        let mut merged = toml::Table::new();

        for source in &self.sources {
            for entry in source.entries()? {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(SettingsError::DeserializeError)
    }
}
