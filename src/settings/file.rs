//! TOML file settings source.

use std::path::{Path, PathBuf};

use super::source::{SettingsEntry, SettingsSource};
use super::SettingsError;

/// Loads settings from a TOML file.
///
/// A required file that does not exist is an error; a missing optional
/// file contributes nothing.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl SettingsSource for FileSource {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let table = toml::from_str(&contents).map_err(|e| SettingsError::ParseError {
                    path: self.path.clone(),
                    source: e,
                })?;
                Ok(vec![SettingsEntry::root(table)])
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.required {
                    Err(SettingsError::FileNotFound(self.path.clone()))
                } else {
                    Ok(vec![])
                }
            }
            Err(e) => Err(SettingsError::ReadError {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
