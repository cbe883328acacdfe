use chrono::{DateTime, Datelike, Local, SecondsFormat, TimeZone, Timelike, Utc};

use super::tree::{Constant, ConstantsTree};
use super::Namespace;
use crate::event::{CommandInvocation, CommandOption, ComponentInvocation, Member, Message, User};

/// Anything a per-event constants set can be derived from.
pub trait ContextSource {
    /// The user that caused the event, if any.
    fn user(&self) -> Option<&User>;

    /// Options supplied with a command invocation.
    fn options(&self) -> &[CommandOption] {
        &[]
    }
}

impl ContextSource for Member {
    fn user(&self) -> Option<&User> {
        Some(&self.user)
    }
}

impl ContextSource for CommandInvocation {
    fn user(&self) -> Option<&User> {
        Some(&self.user)
    }

    fn options(&self) -> &[CommandOption] {
        &self.options
    }
}

impl ContextSource for ComponentInvocation {
    fn user(&self) -> Option<&User> {
        Some(&self.user)
    }
}

impl ContextSource for Message {
    fn user(&self) -> Option<&User> {
        Some(&self.author)
    }
}

/// The event itself is unknown, only the clock contributes.
impl ContextSource for () {
    fn user(&self) -> Option<&User> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Branch {
    namespace: Namespace,
    raw: ConstantsTree,
    encoded: ConstantsTree,
}

/// Constants derived from one event: `@DATE`, `@USER` and `@OPTIONS`.
///
/// Built fresh for every event and never shared between events.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextConstants {
    branches: Vec<Branch>,
}

impl ContextConstants {
    /// Builds the constants for `source`, stamping `@DATE` with the current
    /// local time.
    pub fn build(source: &impl ContextSource) -> Self {
        Self::build_at(source, Local::now())
    }

    pub fn build_at<Tz>(source: &impl ContextSource, now: DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut context = Self {
            branches: Vec::with_capacity(3),
        };
        context.push(Namespace::Date, date_branch(&now));

        if let Some(user) = source.user() {
            context.push(Namespace::User, user_branch(user));
        }

        let options = options_branch(source.options());
        if !options.is_empty() {
            context.push(Namespace::Options, options);
        }

        context
    }

    fn push(&mut self, namespace: Namespace, raw: ConstantsTree) {
        let encoded = raw.encoded();
        self.branches.push(Branch {
            namespace,
            raw,
            encoded,
        });
    }

    pub fn branch(&self, namespace: Namespace) -> Option<&ConstantsTree> {
        self.branches
            .iter()
            .find(|branch| branch.namespace == namespace)
            .map(|branch| &branch.raw)
    }

    /// `(namespace, raw, encoded)` for each derived branch.
    pub fn branches(&self) -> impl Iterator<Item = (Namespace, &ConstantsTree, &ConstantsTree)> {
        self.branches
            .iter()
            .map(|branch| (branch.namespace, &branch.raw, &branch.encoded))
    }
}

fn date_branch<Tz>(now: &DateTime<Tz>) -> ConstantsTree
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut date = ConstantsTree::new();
    date.insert("TIMESTAMP", now.timestamp_millis());
    date.insert("DATE_STRING", now.format("%a %b %d %Y").to_string());
    date.insert("TIME_STRING", now.format("%H:%M:%S GMT%z").to_string());
    date.insert(
        "JSON_STRING",
        now.with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    date.insert("DAY", i64::from(now.weekday().num_days_from_sunday()));
    date.insert("MONTH", i64::from(now.month0()));
    date.insert("YEAR", i64::from(now.year()));
    date.insert("HOURS", i64::from(now.hour()));
    date.insert("MINUTES", i64::from(now.minute()));
    date.insert("SECONDS", i64::from(now.second()));
    date
}

fn user_branch(user: &User) -> ConstantsTree {
    let mut branch = ConstantsTree::new();
    branch.insert("ID", user.id.to_string());
    branch.insert("USERNAME", user.username.as_str());
    branch.insert("TAG", user.discriminator.as_str());
    branch.insert("AVATAR", user.avatar_url());
    branch
}

fn options_branch(options: &[CommandOption]) -> ConstantsTree {
    let mut branch = ConstantsTree::new();
    for option in options {
        if option.kind.is_subcommand() {
            continue;
        }
        let Some(value) = option.value.clone() else {
            continue;
        };
        let constant = match value {
            serde_json::Value::Object(map) => Some(Constant::Tree(upper_case_keys(map))),
            other => Constant::from_json(other),
        };
        if let Some(constant) = constant {
            branch.insert(option.name.to_uppercase(), constant);
        }
    }
    branch
}

/// Upper-cases every key of a structured option value, at every depth.
/// Values are left untouched.
fn upper_case_keys(map: serde_json::Map<String, serde_json::Value>) -> ConstantsTree {
    let mut tree = ConstantsTree::new();
    for (key, value) in map {
        let constant = match value {
            serde_json::Value::Object(nested) => Some(Constant::Tree(upper_case_keys(nested))),
            other => Constant::from_json(other),
        };
        if let Some(constant) = constant {
            tree.insert(key.to_uppercase(), constant);
        }
    }
    tree
}
