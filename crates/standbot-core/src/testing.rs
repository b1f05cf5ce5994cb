//! Test doubles shared by the standbot crates.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, StandbotError};
use crate::traits::Transport;
use crate::types::{ChannelHandle, OutgoingMessage};

/// Transport that records every send and fails on request.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    created: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
    missing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `channel_id` will return `Delivery` errors.
    pub fn fail_sends_to(&self, channel_id: &str) {
        self.failing.lock().unwrap().insert(channel_id.to_string());
    }

    /// `channel_id` will no longer resolve.
    pub fn remove_channel(&self, channel_id: &str) {
        self.missing.lock().unwrap().insert(channel_id.to_string());
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, channel_id: &str) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| id == channel_id)
            .map(|(_, m)| m)
            .collect()
    }

    /// `(group_id, channel_name)` for every created channel.
    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelHandle> {
        if self.missing.lock().unwrap().contains(channel_id) {
            return Err(StandbotError::ChannelNotFound(channel_id.to_string()));
        }
        Ok(ChannelHandle {
            id: channel_id.to_string(),
            name: None,
        })
    }

    async fn send_to_channel(&self, channel: &ChannelHandle, message: &OutgoingMessage) -> Result<()> {
        if self.failing.lock().unwrap().contains(&channel.id) {
            return Err(StandbotError::Delivery(format!("send to {} refused", channel.id)));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.id.clone(), message.clone()));
        Ok(())
    }

    async fn create_text_channel(&self, group_id: &str, name: &str, _topic: &str) -> Result<String> {
        self.created
            .lock()
            .unwrap()
            .push((group_id.to_string(), name.to_string()));
        Ok(format!("chan-{group_id}"))
    }
}
