//! Discord gateway listener: WebSocket session, heartbeats and event parsing.
//! Handles: READY, GUILD_CREATE, GUILD_DELETE, MESSAGE_CREATE.

use std::collections::HashSet;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::Stream;
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use standbot_core::config::DiscordConfig;
use standbot_core::error::{Result, StandbotError};
use standbot_core::types::{ChatEvent, IncomingMessage};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_DIRECT_MESSAGES: u64 = 1 << 12;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

/// Everything the bot listens to.
pub const INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_DIRECT_MESSAGES | INTENT_MESSAGE_CONTENT;

/// Raw gateway frame.
#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// How a session ended without an error.
enum SessionEnd {
    Reconnect,
    ReceiverDropped,
}

/// What the listener remembers across sessions.
#[derive(Debug, Default)]
pub struct GatewayState {
    pub bot_user_id: Option<String>,
    /// Guilds the bot was already in; GUILD_CREATE for these is not a join.
    pub guilds: HashSet<String>,
    pub sequence: Option<u64>,
}

impl GatewayState {
    /// Fold one dispatch event into the state and map it to a chat event.
    pub fn apply_dispatch(&mut self, event: &str, data: &Value) -> Option<ChatEvent> {
        match event {
            "READY" => {
                self.bot_user_id = data["user"]["id"].as_str().map(String::from);
                self.guilds = data["guilds"]
                    .as_array()
                    .map(|guilds| {
                        guilds
                            .iter()
                            .filter_map(|g| g["id"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();
                tracing::info!(
                    "Discord bot ready: {} ({} guilds)",
                    self.bot_user_id.as_deref().unwrap_or("unknown"),
                    self.guilds.len()
                );
                None
            }
            "GUILD_CREATE" => {
                let id = data["id"].as_str()?;
                self.guilds.insert(id.to_string()).then(|| ChatEvent::GroupJoined {
                    group_id: id.to_string(),
                })
            }
            "GUILD_DELETE" => {
                // unavailable = outage, not a removal
                if data["unavailable"].as_bool().unwrap_or(false) {
                    return None;
                }
                let id = data["id"].as_str()?;
                self.guilds.remove(id);
                Some(ChatEvent::GroupLeft {
                    group_id: id.to_string(),
                })
            }
            "MESSAGE_CREATE" => {
                parse_message(data, self.bot_user_id.as_deref()).map(ChatEvent::Message)
            }
            _ => None,
        }
    }
}

/// Convert a MESSAGE_CREATE payload into an IncomingMessage.
pub fn parse_message(data: &Value, bot_user_id: Option<&str>) -> Option<IncomingMessage> {
    let author = &data["author"];
    let mentions: Vec<String> = data["mentions"]
        .as_array()
        .map(|users| {
            users
                .iter()
                .filter_map(|u| u["id"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    let mentions_bot = bot_user_id.is_some_and(|id| mentions.iter().any(|m| m == id));

    Some(IncomingMessage {
        author_id: author["id"].as_str()?.to_string(),
        author_is_bot: author["bot"].as_bool().unwrap_or(false),
        channel_id: data["channel_id"].as_str()?.to_string(),
        guild_id: data["guild_id"].as_str().map(String::from),
        content: data["content"].as_str().unwrap_or("").to_string(),
        mentions,
        mentions_bot,
    })
}

fn identify_payload(token: &str) -> Value {
    serde_json::json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "standbot",
                "device": "standbot",
            },
        },
    })
}

/// Tracks whether the last scheduled heartbeat was acknowledged.
/// A tick that finds it still pending means the connection is a zombie.
#[derive(Debug, Default)]
struct HeartbeatTracker {
    awaiting_ack: bool,
}

impl HeartbeatTracker {
    /// Returns false if the previous beat was never acknowledged.
    fn beat(&mut self) -> bool {
        if self.awaiting_ack {
            return false;
        }
        self.awaiting_ack = true;
        true
    }

    fn ack(&mut self) {
        self.awaiting_ack = false;
    }
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    serde_json::json!({ "op": OP_HEARTBEAT, "d": sequence })
}

async fn send_json<S>(write: &mut S, payload: &Value) -> Result<()>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
{
    write
        .send(WsMessage::Text(payload.to_string()))
        .await
        .map_err(|e| StandbotError::Channel(format!("Gateway send failed: {e}")))
}

/// Discord gateway listener.
pub struct DiscordGateway {
    gateway_url: String,
    bot_token: String,
    reconnect_delay: Duration,
}

impl DiscordGateway {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            gateway_url: config.gateway_url.clone(),
            bot_token: config.bot_token.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }

    /// Start the listener: returns a stream of chat events.
    /// Reconnects after `reconnect_delay` until the stream is dropped.
    pub fn start(self) -> GatewayStream {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut state = GatewayState::default();
            tracing::info!("Discord gateway listener started");

            loop {
                match self.run_session(&tx, &mut state).await {
                    Ok(SessionEnd::ReceiverDropped) => {
                        tracing::info!("Discord gateway stopped (receiver dropped)");
                        return;
                    }
                    Ok(SessionEnd::Reconnect) => tracing::info!("Discord gateway session ended"),
                    Err(e) => tracing::error!("Discord gateway error: {e}"),
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(self.reconnect_delay).await;
            }
        });

        GatewayStream { rx }
    }

    async fn run_session(
        &self,
        tx: &mpsc::UnboundedSender<ChatEvent>,
        state: &mut GatewayState,
    ) -> Result<SessionEnd> {
        tracing::info!("Connecting to Discord gateway: {}", self.gateway_url);
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.gateway_url)
            .await
            .map_err(|e| StandbotError::Channel(format!("WebSocket connect failed: {e}")))?;
        let (mut write, mut read) = ws_stream.split();

        let hello = loop {
            match read.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let payload: GatewayPayload = serde_json::from_str(&text)?;
                    if payload.op == OP_HELLO {
                        break payload;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(StandbotError::Channel(format!("WebSocket error: {e}")));
                }
                None => {
                    return Err(StandbotError::Channel("gateway closed before hello".into()));
                }
            }
        };
        let interval_ms = hello.d["heartbeat_interval"]
            .as_u64()
            .ok_or_else(|| StandbotError::Channel("hello without heartbeat_interval".into()))?;
        let period = Duration::from_millis(interval_ms);
        let jitter = period.mul_f64(rand::random::<f64>());
        let mut heartbeat = tokio::time::interval_at(Instant::now() + jitter, period);

        let mut beats = HeartbeatTracker::default();

        send_json(&mut write, &identify_payload(&self.bot_token)).await?;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !beats.beat() {
                        tracing::warn!("Discord gateway missed a heartbeat ack, reconnecting");
                        return Ok(SessionEnd::Reconnect);
                    }
                    send_json(&mut write, &heartbeat_payload(state.sequence)).await?;
                }
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(WsMessage::Close(frame))) => {
                            tracing::info!("Discord gateway closed: {:?}", frame);
                            return Ok(SessionEnd::Reconnect);
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            return Err(StandbotError::Channel(format!("WebSocket error: {e}")));
                        }
                        None => return Ok(SessionEnd::Reconnect),
                    };
                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::warn!("Failed to parse gateway frame: {e}");
                            continue;
                        }
                    };
                    if payload.s.is_some() {
                        state.sequence = payload.s;
                    }
                    match payload.op {
                        OP_DISPATCH => {
                            let event = payload.t.as_deref().unwrap_or_default();
                            if let Some(event) = state.apply_dispatch(event, &payload.d)
                                && tx.send(event).is_err()
                            {
                                return Ok(SessionEnd::ReceiverDropped);
                            }
                        }
                        OP_HEARTBEAT => {
                            send_json(&mut write, &heartbeat_payload(state.sequence)).await?;
                        }
                        OP_RECONNECT | OP_INVALID_SESSION => {
                            tracing::warn!("Discord gateway requested reconnect (op {})", payload.op);
                            return Ok(SessionEnd::Reconnect);
                        }
                        OP_HEARTBEAT_ACK => {
                            tracing::trace!("heartbeat ack");
                            beats.ack();
                        }
                        other => tracing::debug!("ignoring gateway op {other}"),
                    }
                }
            }
        }
    }
}

/// Stream of chat events from the gateway.
pub struct GatewayStream {
    rx: mpsc::UnboundedReceiver<ChatEvent>,
}

impl Stream for GatewayStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
