use std::collections::HashMap;

use serde::Deserialize;

use super::interaction::ButtonStyle;
use crate::event::{Member, Snowflake};

/// The bundle's `config.yaml`, after static substitution.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Rules keyed by `command` or `command.subcommand`.
    pub permissions: Option<HashMap<String, PermissionRule>>,
    pub modules: Option<Modules>,
}

impl LiveConfig {
    pub fn permission(&self, command_path: &str) -> Option<&PermissionRule> {
        self.permissions.as_ref()?.get(command_path)
    }

    pub fn verification(&self) -> Option<&VerificationModule> {
        self.modules.as_ref()?.verification.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Modules {
    pub verification: Option<VerificationModule>,
}

/// Welcome message posted when a member joins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerificationModule {
    pub enabled: bool,
    pub welcome_channel: Option<Snowflake>,
    pub button: Option<VerificationButton>,
    pub interactions: Option<VerificationInteractions>,
}

impl VerificationModule {
    pub fn initial_interaction(&self) -> Option<&str> {
        self.interactions
            .as_ref()?
            .initial_message_interaction_path
            .as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerificationButton {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub style: Option<ButtonStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerificationInteractions {
    pub initial_message_interaction_path: Option<String>,
}

/// Role-based access to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionRule {
    pub whitelist: Option<Vec<Snowflake>>,
    pub blacklist: Option<Vec<Snowflake>>,
}

impl PermissionRule {
    fn is_restrictive(&self) -> bool {
        self.whitelist.is_some() || self.blacklist.is_some()
    }
}

/// Decides whether `member` may run a command guarded by `rule`.
///
/// No rule allows everyone. A blacklist, when present, is the only list
/// consulted: any matching role denies. Otherwise a whitelist requires a
/// matching role. Without a member (e.g. a direct message) any list denies.
pub fn has_permission(rule: Option<&PermissionRule>, member: Option<&Member>) -> bool {
    let Some(rule) = rule else {
        return true;
    };
    let Some(member) = member else {
        return !rule.is_restrictive();
    };

    match (&rule.blacklist, &rule.whitelist) {
        (Some(blacklist), _) => !member.has_any_role(blacklist),
        (None, Some(whitelist)) => member.has_any_role(whitelist),
        (None, None) => true,
    }
}
