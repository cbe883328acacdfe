//! Constants that bundle templates can reference.
//!
//! Two provenances coexist: [`StaticConstants`] come from the bundle's
//! constants document and live as long as one snapshot, [`ContextConstants`]
//! are derived from a single event and dropped once it has been handled.
//! Derived values sit in reserved [`Namespace`]s addressed with an `@`
//! prefix (`{{@USER.USERNAME}}`), never inside an authored tree.

mod context;
mod tree;

use std::fmt;

use tracing::warn;

pub use context::{ContextConstants, ContextSource};
pub use tree::{Constant, ConstantsTree, Scalar};

/// Prefix that marks a reserved namespace in a template path.
pub const RESERVED_PREFIX: char = '@';

/// Branches derived by the bot rather than authored in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Percent-encoded mirror of every other branch in scope.
    Encoded,
    Date,
    User,
    Options,
}

impl Namespace {
    pub const ALL: [Self; 4] = [Self::Encoded, Self::Date, Self::User, Self::Options];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encoded => "@ENCODED",
            Self::Date => "@DATE",
            Self::User => "@USER",
            Self::Options => "@OPTIONS",
        }
    }

    pub fn parse(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.as_str() == segment)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constants loaded from the bundle, with their percent-encoded mirror.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticConstants {
    tree: ConstantsTree,
    encoded: ConstantsTree,
}

impl StaticConstants {
    /// Wraps an authored tree. Top-level keys using the reserved prefix are
    /// dropped so they cannot shadow a derived namespace.
    pub fn new(mut tree: ConstantsTree) -> Self {
        let reserved: Vec<String> = tree
            .keys()
            .filter(|key| key.starts_with(RESERVED_PREFIX))
            .map(str::to_owned)
            .collect();
        for key in reserved {
            warn!(key = %key, "dropping constant with reserved prefix");
            tree.remove(&key);
        }

        let encoded = tree.encoded();
        Self { tree, encoded }
    }

    /// Parses a constants document. The document is taken as-is: constants
    /// do not reference each other.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Self::new(ConstantsTree::from_yaml(value)))
    }

    pub fn tree(&self) -> &ConstantsTree {
        &self.tree
    }

    pub fn encoded(&self) -> &ConstantsTree {
        &self.encoded
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
