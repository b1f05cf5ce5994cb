//! Shared data model: standup groups, summary payloads, chat events and outgoing messages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StandbotError};

/// One standup per community (Discord guild).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandupGroup {
    /// Community id, assigned externally when the bot joins.
    pub id: String,
    /// Channel that receives the daily summary.
    pub delivery_channel: String,
    /// Ordered set of member ids; order drives summary ordering.
    #[serde(default)]
    pub members: Vec<String>,
    /// member id -> accumulated response text.
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

impl StandupGroup {
    /// A freshly joined group: no members, no responses.
    pub fn new(id: impl Into<String>, delivery_channel: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delivery_channel: delivery_channel.into(),
            members: Vec::new(),
            responses: BTreeMap::new(),
        }
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.members.iter().any(|m| m == member_id)
    }

    pub fn response(&self, member_id: &str) -> Option<&str> {
        self.responses.get(member_id).map(String::as_str)
    }

    /// Add a member at the end of the order. Returns false if already present.
    pub fn add_member(&mut self, member_id: &str) -> bool {
        if self.is_member(member_id) {
            return false;
        }
        self.members.push(member_id.to_string());
        true
    }

    /// Remove a member together with any response they left behind.
    pub fn remove_member(&mut self, member_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != member_id);
        self.responses.remove(member_id);
        self.members.len() < before
    }

    pub fn clear_responses(&mut self) {
        self.responses.clear();
    }

    /// Drop the responses in `delivered` that are still stored unchanged.
    /// Anything edited or added since keeps waiting for the next summary.
    pub fn clear_delivered(&mut self, delivered: &BTreeMap<String, String>) -> usize {
        let before = self.responses.len();
        self.responses
            .retain(|member, text| delivered.get(member) != Some(text));
        before - self.responses.len()
    }

    /// Check the data-model invariants: unique members, responses keyed by members only.
    pub fn validate(&self) -> Result<()> {
        for (i, member) in self.members.iter().enumerate() {
            if self.members[..i].contains(member) {
                return Err(StandbotError::MalformedGroup {
                    group_id: self.id.clone(),
                    reason: format!("duplicate member {member}"),
                });
            }
        }
        if let Some(stale) = self.responses.keys().find(|k| !self.is_member(k)) {
            return Err(StandbotError::MalformedGroup {
                group_id: self.id.clone(),
                reason: format!("response stored for non-member {stale}"),
            });
        }
        Ok(())
    }
}

/// One display entry of a summary: a member and one segment of their response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub member_id: String,
    pub text: String,
}

/// Everything needed to render one group's daily summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    /// Members without a response, in member order.
    pub missing: Vec<String>,
    /// Human-readable notice built from `missing`.
    pub missing_notice: String,
    pub entries: Vec<SummaryEntry>,
}

/// A message received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub author_id: String,
    pub author_is_bot: bool,
    /// Channel the message was posted in; replies go here.
    pub channel_id: String,
    /// `None` for direct messages.
    pub guild_id: Option<String>,
    pub content: String,
    /// Ids of users mentioned in the message, in order.
    pub mentions: Vec<String>,
    pub mentions_bot: bool,
}

impl IncomingMessage {
    /// Direct messages are the private context update commands require.
    pub fn is_private(&self) -> bool {
        self.guild_id.is_none()
    }
}

/// Events surfaced by a chat listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message(IncomingMessage),
    /// The bot was added to a new community.
    GroupJoined { group_id: String },
    /// The bot was removed from a community.
    GroupLeft { group_id: String },
}

/// A resolved, existing destination channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: Option<String>,
}

/// A rich message block (Discord embed).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// What the bot sends.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    Text(String),
    Embed(Embed),
}
