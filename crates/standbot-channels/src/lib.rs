//! # Standbot Channels
//! Discord plumbing for the standup bot.
//!
//! - `discord`: REST transport (resolve channel, send message, create channel)
//! - `gateway`: WebSocket listener producing `ChatEvent`s

pub mod discord;
pub mod gateway;

pub use discord::DiscordChannel;
pub use gateway::{DiscordGateway, GatewayStream};
