//! # Standbot Core
//!
//! Shared data model, collaborator traits, error taxonomy and configuration
//! used by every other standbot crate.

pub mod config;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;
pub mod types;

pub use config::StandbotConfig;
pub use error::{Result, StandbotError};
pub use memory::MemoryStore;
pub use traits::{StandupStore, Transport};
pub use types::{
    ChannelHandle, ChatEvent, Embed, EmbedField, IncomingMessage, OutgoingMessage, StandupGroup,
    SummaryEntry, SummaryPayload,
};
