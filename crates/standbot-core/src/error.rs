//! Standbot error taxonomy.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StandbotError>;

#[derive(Debug, Error)]
pub enum StandbotError {
    /// The update command carried no message text.
    #[error("no message text was provided")]
    EmptyMessage,

    /// An explicit `@<groupId>` target does not exist.
    #[error("standup group not found: {0}")]
    GroupNotFound(String),

    /// The member is not part of the explicitly named group.
    #[error("not a member of standup group {0}")]
    NotAMember(String),

    /// The member belongs to no standup group at all.
    #[error("not a member of any standup group")]
    NoMembership,

    /// Stored group data violates a data-model invariant.
    #[error("malformed standup group {group_id}: {reason}")]
    MalformedGroup { group_id: String, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StandbotError {
    /// Resolution failures the member can fix by changing the command.
    /// Everything else is an infrastructure failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StandbotError::EmptyMessage
                | StandbotError::GroupNotFound(_)
                | StandbotError::NotAMember(_)
                | StandbotError::NoMembership
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(StandbotError::EmptyMessage.is_user_error());
        assert!(StandbotError::NotAMember("g1".into()).is_user_error());
        assert!(!StandbotError::Store("disk full".into()).is_user_error());
        assert!(!StandbotError::ChannelNotFound("c1".into()).is_user_error());
    }

    #[test]
    fn test_display() {
        let err = StandbotError::MalformedGroup {
            group_id: "g1".into(),
            reason: "duplicate member".into(),
        };
        assert_eq!(err.to_string(), "malformed standup group g1: duplicate member");
    }
}
