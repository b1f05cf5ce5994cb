//! Discord channel: outbound messages and channel management via the REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use standbot_core::config::DiscordConfig;
use standbot_core::error::{Result, StandbotError};
use standbot_core::traits::Transport;
use standbot_core::types::{ChannelHandle, Embed, OutgoingMessage};

/// Discord text channel type.
const GUILD_TEXT: u8 = 0;

/// Discord REST transport.
pub struct DiscordChannel {
    api_base: String,
    bot_token: String,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Get the bot's own user.
    pub async fn get_me(&self) -> Result<DiscordUser> {
        let response = self
            .client
            .get(self.api_url("users/@me"))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| StandbotError::Channel(format!("Discord getMe failed: {e}")))?;
        if !response.status().is_success() {
            return Err(StandbotError::Channel(format!(
                "Discord getMe returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| StandbotError::Channel(format!("Invalid getMe response: {e}")))
    }
}

/// JSON body for a create-message call.
pub fn message_body(message: &OutgoingMessage) -> serde_json::Value {
    match message {
        OutgoingMessage::Text(content) => serde_json::json!({ "content": content }),
        OutgoingMessage::Embed(embed) => serde_json::json!({ "embeds": [embed_json(embed)] }),
    }
}

fn embed_json(embed: &Embed) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = embed
        .fields
        .iter()
        .map(|f| serde_json::json!({ "name": f.name, "value": f.value, "inline": f.inline }))
        .collect();
    let mut json = serde_json::json!({
        "title": embed.title,
        "description": embed.description,
        "color": embed.color,
        "fields": fields,
    });
    if let Some(ts) = embed.timestamp {
        json["timestamp"] = serde_json::Value::String(ts.to_rfc3339());
    }
    json
}

#[async_trait]
impl Transport for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelHandle> {
        let response = self
            .client
            .get(self.api_url(&format!("channels/{channel_id}")))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| StandbotError::Delivery(format!("Discord channel lookup failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StandbotError::ChannelNotFound(channel_id.to_string())),
            status if !status.is_success() => Err(StandbotError::Delivery(format!(
                "Discord channel lookup returned {status}"
            ))),
            _ => {
                let channel: DiscordChannelInfo = response.json().await.map_err(|e| {
                    StandbotError::Delivery(format!("Invalid channel response: {e}"))
                })?;
                Ok(ChannelHandle {
                    id: channel.id,
                    name: channel.name,
                })
            }
        }
    }

    async fn send_to_channel(&self, channel: &ChannelHandle, message: &OutgoingMessage) -> Result<()> {
        let response = self
            .client
            .post(self.api_url(&format!("channels/{}/messages", channel.id)))
            .header("Authorization", self.auth())
            .json(&message_body(message))
            .send()
            .await
            .map_err(|e| StandbotError::Delivery(format!("Discord send failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StandbotError::ChannelNotFound(channel.id.clone())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(StandbotError::Delivery(format!(
                    "Discord send returned {status}: {body}"
                )))
            }
            _ => Ok(()),
        }
    }

    async fn create_text_channel(&self, group_id: &str, name: &str, topic: &str) -> Result<String> {
        let body = serde_json::json!({
            "name": name,
            "type": GUILD_TEXT,
            "topic": topic,
        });
        let response = self
            .client
            .post(self.api_url(&format!("guilds/{group_id}/channels")))
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await
            .map_err(|e| StandbotError::Channel(format!("Discord create channel failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StandbotError::Channel(format!(
                "Discord create channel returned {}",
                response.status()
            )));
        }
        let created: DiscordChannelInfo = response
            .json()
            .await
            .map_err(|e| StandbotError::Channel(format!("Invalid create channel response: {e}")))?;
        tracing::info!("Created channel #{name} ({}) in {group_id}", created.id);
        Ok(created.id)
    }
}

// --- Discord API Types ---

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordChannelInfo {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use standbot_core::types::EmbedField;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(server: &MockServer) -> DiscordChannel {
        DiscordChannel::new(&DiscordConfig {
            bot_token: "tok".into(),
            api_base: server.uri(),
            ..DiscordConfig::default()
        })
    }

    #[test]
    fn test_embed_body() {
        let embed = Embed {
            title: "Daily Standup".into(),
            description: "Nobody missed".into(),
            color: 0xFF9900,
            fields: vec![EmbedField {
                name: "-".into(),
                value: "<@u1>\nhi".into(),
                inline: false,
            }],
            timestamp: Some(Utc.with_ymd_and_hms(2026, 10, 19, 10, 30, 0).unwrap()),
        };
        let body = message_body(&OutgoingMessage::Embed(embed));
        let e = &body["embeds"][0];
        assert_eq!(e["color"], 0xFF9900);
        assert_eq!(e["fields"][0]["value"], "<@u1>\nhi");
        assert_eq!(e["timestamp"], "2026-10-19T10:30:00+00:00");

        let text = message_body(&OutgoingMessage::Text("hey".into()));
        assert_eq!(text, serde_json::json!({ "content": "hey" }));
    }

    #[tokio::test]
    async fn test_resolve_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/123"))
            .and(header("Authorization", "Bot tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": "123", "name": "daily-standups" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let discord = channel(&server);
        let handle = discord.resolve_channel("123").await.unwrap();
        assert_eq!(handle.name.as_deref(), Some("daily-standups"));
        assert!(matches!(
            discord.resolve_channel("404").await,
            Err(StandbotError::ChannelNotFound(id)) if id == "404"
        ));
    }

    #[tokio::test]
    async fn test_send_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/9/messages"))
            .and(body_json(serde_json::json!({ "content": "Updated Response :tada:" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "1" })))
            .expect(1)
            .mount(&server)
            .await;

        channel(&server)
            .send("9", &OutgoingMessage::Text("Updated Response :tada:".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/9/messages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Missing Access"))
            .mount(&server)
            .await;

        let err = channel(&server)
            .send("9", &OutgoingMessage::Text("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StandbotError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_create_text_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/guilds/g1/channels"))
            .and(body_json(serde_json::json!({
                "name": "daily-standups",
                "type": 0,
                "topic": "Scrum Standup Meeting Channel",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "c77" })))
            .mount(&server)
            .await;

        let id = channel(&server)
            .create_text_channel("g1", "daily-standups", "Scrum Standup Meeting Channel")
            .await
            .unwrap();
        assert_eq!(id, "c77");
    }
}
