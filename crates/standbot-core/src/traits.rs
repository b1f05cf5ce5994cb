//! Collaborator seams: persistence and chat transport.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelHandle, OutgoingMessage, StandupGroup};

/// Persistence over standup-group documents.
///
/// Implementations must round-trip `members` in insertion order and
/// return `find_all` in a stable order.
#[async_trait]
pub trait StandupStore: Send + Sync {
    fn name(&self) -> &str;
    async fn find_by_id(&self, id: &str) -> Result<Option<StandupGroup>>;
    async fn find_all(&self) -> Result<Vec<StandupGroup>>;
    /// Insert or replace the whole document.
    async fn save(&self, group: &StandupGroup) -> Result<()>;
    async fn delete_by_id(&self, id: &str) -> Result<()>;
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Look up a channel; `ChannelNotFound` if it no longer exists.
    async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelHandle>;

    /// Send to an already resolved channel.
    async fn send_to_channel(&self, channel: &ChannelHandle, message: &OutgoingMessage) -> Result<()>;

    /// Create a text channel inside a community and return its id.
    async fn create_text_channel(&self, group_id: &str, name: &str, topic: &str) -> Result<String>;

    /// Send to a channel id without resolving it first (command replies).
    async fn send(&self, channel_id: &str, message: &OutgoingMessage) -> Result<()> {
        let handle = ChannelHandle {
            id: channel_id.to_string(),
            name: None,
        };
        self.send_to_channel(&handle, message).await
    }
}
