use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::ContextConstants;
use crate::template::{self, Scope};

/// A message a live interaction renders to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    pub ephemeral: bool,
}

impl InteractionDefinition {
    /// Substitutes the per-event constants into a copy of this definition.
    pub fn render(&self, context: &ContextConstants) -> Result<Self, serde_yaml::Error> {
        template::render(self, &Scope::new().with_context(context))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Button(Button),
    Select(SelectMenu),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonStyle {
    #[default]
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
    Link = 5,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Button {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub style: ButtonStyle,
    /// Routed to the local interaction registry when pressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Only for [`ButtonStyle::Link`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectMenu {
    pub custom_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_values: Option<u8>,
    pub options: Vec<SelectOption>,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub default: bool,
}

/// Interaction definitions of one snapshot, keyed by their bundle path
/// without extension (`verification/welcome`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveInteractions {
    by_id: BTreeMap<String, InteractionDefinition>,
}

impl LiveInteractions {
    pub fn insert(&mut self, id: impl Into<String>, definition: InteractionDefinition) {
        self.by_id.insert(id.into(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&InteractionDefinition> {
        self.by_id.get(id.trim_matches('/'))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::event::{CommandInvocation, CommandOption, InteractionTarget, OptionKind, Snowflake, User};

    const WELCOME: &str = r#"
content: "Hi {{@USER.USERNAME}}, you chose {{@OPTIONS.COUNT}}"
ephemeral: true
embeds:
  - title: "Rules for {{@USER.USERNAME}}"
    color: 5814783
    fields:
      - name: "Count"
        value: "{{@OPTIONS.COUNT}}"
components:
  - components:
      - type: button
        label: "Accept"
        custom_id: accept
      - type: button
        label: "Docs"
        style: LINK
        url: "https://docs.example/?u={{@ENCODED.@USER.USERNAME}}"
      - type: select
        custom_id: role
        options:
          - label: "Red"
            value: red
"#;

    fn invocation() -> CommandInvocation {
        CommandInvocation {
            target: InteractionTarget {
                id: Snowflake(1),
                token: "t".into(),
            },
            name: "welcome".into(),
            options: vec![CommandOption::value("count", OptionKind::Integer, json!(5))],
            user: User {
                id: Snowflake(2),
                username: "Jo Jo".into(),
                discriminator: "0".into(),
                avatar: None,
                bot: false,
            },
            member: None,
            channel_id: Snowflake(3),
        }
    }

    #[test]
    fn test_parse_definition() {
        let definition: InteractionDefinition = serde_yaml::from_str(WELCOME).unwrap();
        assert!(definition.ephemeral);
        assert_eq!(definition.embeds[0].color, Some(5814783));
        let row = &definition.components[0].components;
        assert_eq!(row.len(), 3);
        assert!(matches!(&row[0], Component::Button(b) if b.style == ButtonStyle::Primary));
        assert!(matches!(&row[1], Component::Button(b) if b.style == ButtonStyle::Link));
        assert!(matches!(&row[2], Component::Select(s) if s.options.len() == 1));
    }

    #[test]
    fn test_render_substitutes_context() {
        let definition: InteractionDefinition = serde_yaml::from_str(WELCOME).unwrap();
        let context = ContextConstants::build(&invocation());
        let rendered = definition.render(&context).unwrap();

        assert_eq!(rendered.content.as_deref(), Some("Hi Jo Jo, you chose 5"));
        assert_eq!(rendered.embeds[0].title.as_deref(), Some("Rules for Jo Jo"));
        assert_eq!(rendered.embeds[0].fields[0].value, "5");
        let Component::Button(docs) = &rendered.components[0].components[1] else {
            panic!("expected a button");
        };
        assert_eq!(docs.url.as_deref(), Some("https://docs.example/?u=Jo%20Jo"));

        // the stored definition is untouched
        assert_eq!(
            definition.content.as_deref(),
            Some("Hi {{@USER.USERNAME}}, you chose {{@OPTIONS.COUNT}}")
        );
    }

    #[test]
    fn test_lookup_ignores_surrounding_slashes() {
        let mut interactions = LiveInteractions::default();
        interactions.insert("verification/welcome", InteractionDefinition::default());
        assert!(interactions.get("/verification/welcome").is_some());
        assert!(interactions.get("verification/other").is_none());
    }
}
