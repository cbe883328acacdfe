use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Method};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{OutboundMessage, Platform, PlatformError};
use crate::event::{InteractionTarget, Snowflake};
use crate::live::{ActionRow, CommandDefinition, Component, Embed, OptionDefinition};

const API_BASE: &str = "https://discord.com/api/v10";
const EPHEMERAL_FLAG: u64 = 1 << 6;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// [`Platform`] over the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordRest {
    client: reqwest::Client,
    base_url: String,
    token: String,
    application_id: Snowflake,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>, application_id: Snowflake) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: API_BASE.to_owned(),
            token: token.into(),
            application_id,
        }
    }

    /// Points the client at another API root, e.g. a local proxy.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn request(
        &self,
        method: Method,
        route: String,
        body: Option<Value>,
    ) -> Result<(), PlatformError> {
        debug!(%method, %route, "platform request");
        let mut request = self
            .client
            .request(method, format!("{}{route}", self.base_url))
            .header(AUTHORIZATION, format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|source| PlatformError::Http {
            route: route.clone(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Status {
            route,
            status,
            body,
        })
    }
}

#[async_trait]
impl Platform for DiscordRest {
    async fn login(&self) -> Result<(), PlatformError> {
        self.request(Method::GET, "/users/@me".to_owned(), None).await?;
        info!(application_id = %self.application_id, "logged in");
        Ok(())
    }

    async fn put_guild_commands(
        &self,
        guild_id: Snowflake,
        commands: &[CommandDefinition],
    ) -> Result<(), PlatformError> {
        let body = Value::Array(commands.iter().map(command_payload).collect());
        let route = format!(
            "/applications/{}/guilds/{guild_id}/commands",
            self.application_id
        );
        self.request(Method::PUT, route, Some(body)).await
    }

    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError> {
        let mut body = message_payload(message);
        // channel messages cannot be ephemeral
        if let Some(map) = body.as_object_mut() {
            map.remove("flags");
        }
        let route = format!("/channels/{channel_id}/messages");
        self.request(Method::POST, route, Some(body)).await
    }

    async fn reply(
        &self,
        target: &InteractionTarget,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError> {
        let body = json!({
            "type": CHANNEL_MESSAGE_WITH_SOURCE,
            "data": message_payload(message),
        });
        let route = format!("/interactions/{}/{}/callback", target.id, target.token);
        self.request(Method::POST, route, Some(body)).await
    }

    async fn follow_up(
        &self,
        target: &InteractionTarget,
        message: &OutboundMessage,
    ) -> Result<(), PlatformError> {
        let route = format!("/webhooks/{}/{}", self.application_id, target.token);
        self.request(Method::POST, route, Some(message_payload(message)))
            .await
    }

    async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), PlatformError> {
        let route = format!("/channels/{channel_id}/messages/{message_id}");
        self.request(Method::DELETE, route, None).await
    }

    async fn set_auto_archive_duration(
        &self,
        thread_id: Snowflake,
        minutes: u32,
    ) -> Result<(), PlatformError> {
        let route = format!("/channels/{thread_id}");
        let body = json!({ "auto_archive_duration": minutes });
        self.request(Method::PATCH, route, Some(body)).await
    }

    async fn destroy(&self) {
        info!("discord client destroyed");
    }
}

fn insert_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_owned(), value);
    }
}

fn command_payload(command: &CommandDefinition) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), json!(command.name));
    map.insert("description".into(), json!(command.description));
    if !command.options.is_empty() {
        map.insert(
            "options".into(),
            Value::Array(command.options.iter().map(option_payload).collect()),
        );
    }
    Value::Object(map)
}

fn option_payload(option: &OptionDefinition) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), json!(option.kind as u8));
    map.insert("name".into(), json!(option.name));
    map.insert("description".into(), json!(option.description));
    if !option.kind.is_subcommand() {
        map.insert("required".into(), json!(option.required));
    }
    if option.autocomplete {
        map.insert("autocomplete".into(), json!(true));
    }
    if !option.choices.is_empty() {
        map.insert("choices".into(), json!(option.choices));
    }
    insert_some(&mut map, "min_value", option.min_value.map(|v| json!(v)));
    insert_some(&mut map, "max_value", option.max_value.map(|v| json!(v)));
    if !option.options.is_empty() {
        map.insert(
            "options".into(),
            Value::Array(option.options.iter().map(option_payload).collect()),
        );
    }
    Value::Object(map)
}

fn message_payload(message: &OutboundMessage) -> Value {
    let mut map = Map::new();
    insert_some(&mut map, "content", message.content.as_ref().map(|c| json!(c)));
    map.insert(
        "embeds".into(),
        Value::Array(message.embeds.iter().map(embed_payload).collect()),
    );
    map.insert(
        "components".into(),
        Value::Array(message.components.iter().map(row_payload).collect()),
    );
    if message.ephemeral {
        map.insert("flags".into(), json!(EPHEMERAL_FLAG));
    }
    Value::Object(map)
}

fn embed_payload(embed: &Embed) -> Value {
    let mut map = Map::new();
    insert_some(&mut map, "title", embed.title.as_ref().map(|v| json!(v)));
    insert_some(&mut map, "description", embed.description.as_ref().map(|v| json!(v)));
    insert_some(&mut map, "url", embed.url.as_ref().map(|v| json!(v)));
    insert_some(&mut map, "color", embed.color.map(|v| json!(v)));
    insert_some(&mut map, "footer", embed.footer.as_ref().map(|v| json!({ "text": v })));
    insert_some(&mut map, "image", embed.image.as_ref().map(|v| json!({ "url": v })));
    insert_some(&mut map, "thumbnail", embed.thumbnail.as_ref().map(|v| json!({ "url": v })));
    if !embed.fields.is_empty() {
        map.insert("fields".into(), json!(embed.fields));
    }
    Value::Object(map)
}

fn row_payload(row: &ActionRow) -> Value {
    json!({
        "type": 1,
        "components": row.components.iter().map(component_payload).collect::<Vec<_>>(),
    })
}

fn component_payload(component: &Component) -> Value {
    let mut map = Map::new();
    match component {
        Component::Button(button) => {
            map.insert("type".into(), json!(2));
            map.insert("style".into(), json!(button.style as u8));
            insert_some(&mut map, "label", button.label.as_ref().map(|v| json!(v)));
            insert_some(&mut map, "custom_id", button.custom_id.as_ref().map(|v| json!(v)));
            insert_some(&mut map, "url", button.url.as_ref().map(|v| json!(v)));
            insert_some(&mut map, "emoji", button.emoji.as_ref().map(|v| json!({ "name": v })));
            map.insert("disabled".into(), json!(button.disabled));
        }
        Component::Select(select) => {
            map.insert("type".into(), json!(3));
            map.insert("custom_id".into(), json!(select.custom_id));
            insert_some(&mut map, "placeholder", select.placeholder.as_ref().map(|v| json!(v)));
            insert_some(&mut map, "min_values", select.min_values.map(|v| json!(v)));
            insert_some(&mut map, "max_values", select.max_values.map(|v| json!(v)));
            let options: Vec<Value> = select
                .options
                .iter()
                .map(|option| {
                    let mut entry = Map::new();
                    entry.insert("label".into(), json!(option.label));
                    entry.insert("value".into(), json!(option.value));
                    insert_some(&mut entry, "description", option.description.as_ref().map(|v| json!(v)));
                    insert_some(&mut entry, "emoji", option.emoji.as_ref().map(|v| json!({ "name": v })));
                    entry.insert("default".into(), json!(option.default));
                    Value::Object(entry)
                })
                .collect();
            map.insert("options".into(), Value::Array(options));
            map.insert("disabled".into(), json!(select.disabled));
        }
    }
    Value::Object(map)
}
