//! The bot: routes chat events to commands and handles joining/leaving communities.

use std::sync::Arc;

use chrono::Utc;
use standbot_core::config::SummaryConfig;
use standbot_core::error::Result;
use standbot_core::traits::{StandupStore, Transport};
use standbot_core::types::{ChatEvent, IncomingMessage, OutgoingMessage, StandupGroup};

use crate::commands::{CommandContext, CommandRegistry};
use crate::messages;

/// A parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// Split `content` into a lower-cased command name and its arguments.
/// `None` when the message does not start with `prefix` or names nothing.
pub fn parse_invocation(prefix: &str, content: &str) -> Option<Invocation> {
    let rest = content.strip_prefix(prefix)?.trim();
    let mut tokens = rest.split(' ').filter(|t| !t.is_empty()).map(String::from);
    let name = tokens.next()?.to_lowercase();
    Some(Invocation {
        name,
        args: tokens.collect(),
    })
}

pub struct StandupBot {
    registry: CommandRegistry,
    store: Arc<dyn StandupStore>,
    transport: Arc<dyn Transport>,
    prefix: String,
    summary: SummaryConfig,
}

impl StandupBot {
    pub fn new(
        registry: CommandRegistry,
        store: Arc<dyn StandupStore>,
        transport: Arc<dyn Transport>,
        prefix: impl Into<String>,
        summary: SummaryConfig,
    ) -> Self {
        Self {
            registry,
            store,
            transport,
            prefix: prefix.into(),
            summary,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handle one chat event. Errors are logged here; the listener keeps going.
    pub async fn handle_event(&self, event: ChatEvent) {
        match event {
            ChatEvent::Message(message) => self.handle_message(&message).await,
            ChatEvent::GroupJoined { group_id } => {
                if let Err(e) = self.on_group_joined(&group_id).await {
                    tracing::error!("Setting up standup for {group_id} failed: {e}");
                }
            }
            ChatEvent::GroupLeft { group_id } => {
                if let Err(e) = self.on_group_left(&group_id).await {
                    tracing::error!("Removing standup for {group_id} failed: {e}");
                }
            }
        }
    }

    /// Run the command in `message` (if any) and post its replies in the same channel.
    pub async fn handle_message(&self, message: &IncomingMessage) {
        for reply in self.replies_for(message).await {
            if let Err(e) = self.transport.send(&message.channel_id, &reply).await {
                tracing::warn!("Reply to {} failed: {e}", message.channel_id);
            }
        }
    }

    /// The replies a message should get, without sending them.
    pub async fn replies_for(&self, message: &IncomingMessage) -> Vec<OutgoingMessage> {
        if message.author_is_bot {
            tracing::debug!("message was sent by bot");
            return Vec::new();
        }
        let Some(invocation) = parse_invocation(&self.prefix, &message.content) else {
            tracing::debug!("message did not start with prefix '{}'", self.prefix);
            return Vec::new();
        };
        let Some(command) = self.registry.find(&invocation.name) else {
            tracing::debug!("command '{}' is not recognised", invocation.name);
            return Vec::new();
        };

        if message.mentions_bot {
            return vec![OutgoingMessage::Text(messages::BOT_MENTIONED.into())];
        }
        if command.guild_only() && message.is_private() {
            return vec![OutgoingMessage::Text(messages::GUILD_ONLY.into())];
        }

        let ctx = CommandContext {
            message,
            args: invocation.args,
            prefix: &self.prefix,
            store: self.store.as_ref(),
            registry: &self.registry,
        };
        match command.execute(&ctx).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::error!("Command '{}' failed: {e}", invocation.name);
                vec![OutgoingMessage::Text(messages::COMMAND_FAILURE.into())]
            }
        }
    }

    /// Create the delivery channel and an empty standup, then introduce the bot.
    pub async fn on_group_joined(&self, group_id: &str) -> Result<StandupGroup> {
        tracing::debug!("attempting to create '{}'", self.summary.channel_name);
        let channel_id = self
            .transport
            .create_text_channel(group_id, &self.summary.channel_name, &self.summary.channel_topic)
            .await?;

        let group = StandupGroup::new(group_id, channel_id.clone());
        self.store.save(&group).await?;
        tracing::info!("Standup created for {group_id} (channel {channel_id})");

        let intro = messages::intro_embed(&self.prefix, Utc::now());
        self.transport
            .send(&channel_id, &OutgoingMessage::Embed(intro))
            .await?;
        Ok(group)
    }

    pub async fn on_group_left(&self, group_id: &str) -> Result<()> {
        self.store.delete_by_id(group_id).await?;
        tracing::info!("Standup removed for {group_id}");
        Ok(())
    }
}
