//! # Standbot Engine
//!
//! Everything between a chat command and a stored response, and between a
//! stored response and a rendered summary.
//!
//! ```text
//! !task text ─▶ resolver ─▶ merge ─▶ StandupStore::save
//! trigger ─▶ aggregate ─▶ segment (per member) ─▶ summary embed
//! ```

pub mod aggregate;
pub mod bot;
pub mod commands;
pub mod merge;
pub mod messages;
pub mod resolver;
pub mod segment;

pub use aggregate::{Aggregate, aggregate};
pub use bot::StandupBot;
pub use commands::{Command, CommandContext, CommandRegistry};
pub use merge::{UpdatePolicy, merge};
pub use resolver::{Ambiguity, ResolvedTarget, resolve, resolve_in_store};
pub use segment::Segmenter;
