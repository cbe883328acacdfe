//! Reading bundle documents into snapshot parts.
//!
//! Loading never fails: a missing document yields an empty part, and a
//! document that cannot be read or parsed is logged and treated as missing.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::command::{CommandDefinition, LiveCommands};
use super::config::LiveConfig;
use super::interaction::{InteractionDefinition, LiveInteractions};
use super::trigger::{LiveTriggers, Trigger, TriggerDefinition};
use crate::bundle::{COMMANDS_DIR, CONFIG_FILE, CONSTANTS_FILE, INTERACTIONS_DIR, TRIGGERS_FILE};
use crate::constants::StaticConstants;
use crate::template::{substitute, Scope};

pub fn load_constants(root: &Path) -> StaticConstants {
    let path = root.join(CONSTANTS_FILE);
    let Some(text) = read_document(&path) else {
        return StaticConstants::default();
    };
    match StaticConstants::from_yaml_str(&text) {
        Ok(constants) => {
            debug!(path = %path.display(), constants = ?constants.tree(), "loaded constants");
            constants
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid constants document, using none");
            StaticConstants::default()
        }
    }
}

pub fn load_config(root: &Path, constants: &StaticConstants) -> LiveConfig {
    let path = root.join(CONFIG_FILE);
    let config = read_templated(&path, constants)
        .and_then(|text| parse_document(&path, &text))
        .unwrap_or_default();
    debug!(config = ?config, "loaded config");
    config
}

pub fn load_commands(root: &Path, constants: &StaticConstants) -> LiveCommands {
    let mut commands = LiveCommands::default();
    for (_, path) in yaml_files(&root.join(COMMANDS_DIR)) {
        let Some(definition) = read_templated(&path, constants)
            .and_then(|text| parse_document::<Option<CommandDefinition>>(&path, &text))
            .flatten()
        else {
            continue;
        };
        if definition.name.is_empty() {
            warn!(path = %path.display(), "command without a name, skipping");
            continue;
        }
        commands.push(definition);
    }
    commands
}

pub fn load_interactions(root: &Path, constants: &StaticConstants) -> LiveInteractions {
    let mut interactions = LiveInteractions::default();
    for (id, path) in yaml_files(&root.join(INTERACTIONS_DIR)) {
        if let Some(definition) = read_templated(&path, constants)
            .and_then(|text| parse_document::<InteractionDefinition>(&path, &text))
        {
            interactions.insert(id, definition);
        }
    }
    interactions
}

pub fn load_triggers(root: &Path, constants: &StaticConstants) -> LiveTriggers {
    let path = root.join(TRIGGERS_FILE);
    let definitions: Vec<TriggerDefinition> = read_templated(&path, constants)
        .and_then(|text| parse_document(&path, &text))
        .unwrap_or_default();

    let mut triggers = LiveTriggers::default();
    for definition in definitions {
        let pattern = definition.pattern.clone();
        match Trigger::compile(definition) {
            Ok(trigger) => triggers.push(trigger),
            Err(e) => warn!(pattern = %pattern, error = %e, "invalid trigger pattern, skipping"),
        }
    }
    triggers
}

/// Reads a document and substitutes the static constants into it.
fn read_templated(path: &Path, constants: &StaticConstants) -> Option<String> {
    let text = read_document(path)?;
    Some(substitute(&Scope::new().with_static(constants), &text))
}

fn read_document(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read bundle document");
            None
        }
    }
}

/// Parses a YAML document; an empty document gives the default value.
fn parse_document<T: DeserializeOwned + Default>(path: &Path, text: &str) -> Option<T> {
    let parsed = serde_yaml::from_str::<serde_yaml::Value>(text).and_then(|value| match value {
        serde_yaml::Value::Null => Ok(T::default()),
        value => serde_yaml::from_value(value),
    });
    match parsed {
        Ok(document) => Some(document),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse bundle document");
            None
        }
    }
}

/// YAML files below `dir`, paired with their id: the path relative to `dir`
/// without extension, `/`-separated. Sorted by id. Symlinks are not followed.
fn yaml_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 && is_not_found(&e) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to walk bundle folder");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        if !is_yaml {
            continue;
        }
        let Ok(relative) = path.with_extension("").strip_prefix(dir).map(Path::to_path_buf) else {
            continue;
        };
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((id, path));
    }
    files.sort();
    files
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}
