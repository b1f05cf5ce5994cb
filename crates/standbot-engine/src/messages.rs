//! User-facing text and embeds.

use chrono::{DateTime, Utc};
use standbot_core::error::StandbotError;
use standbot_core::types::{Embed, EmbedField, SummaryPayload};

use crate::resolver::{Ambiguity, GROUP_MARKER};

/// `#ff9900`
pub const STANDUP_COLOR: u32 = 0xFF9900;
pub const SUMMARY_TITLE: &str = "Daily Standup";

pub const UPDATED: &str = "Updated Response :tada:";
pub const GENERIC_FAILURE: &str = "Oh no :scream:! An error occured somewhere in the matrix!";
pub const COMMAND_FAILURE: &str = "Error 8008135: Something went wrong!";
pub const GUILD_ONLY: &str = "Hmm, that command cannot be used in a dm!";
pub const BOT_MENTIONED: &str = ":robot:";

/// Discord rejects embeds above these.
pub const MAX_EMBED_FIELDS: usize = 25;
pub const MAX_EMBED_CHARS: usize = 6000;

/// The daily summary: missing notice as description, one field per segment.
///
/// Split into as many embeds as needed to stay under [`MAX_EMBED_FIELDS`] and
/// [`MAX_EMBED_CHARS`]; only the first carries the missing notice. Always at
/// least one embed, in entry order.
pub fn summary_embeds(payload: &SummaryPayload, at: DateTime<Utc>) -> Vec<Embed> {
    let new_embed = |description: String| Embed {
        title: SUMMARY_TITLE.into(),
        description,
        color: STANDUP_COLOR,
        fields: Vec::new(),
        timestamp: Some(at),
    };

    let mut embeds = Vec::new();
    let mut current = new_embed(payload.missing_notice.clone());
    let mut current_chars = embed_chars(&current);

    for entry in &payload.entries {
        let field = EmbedField {
            name: "-".into(),
            value: format!("<@{}>\n{}", entry.member_id, entry.text),
            inline: false,
        };
        let field_chars = field.name.chars().count() + field.value.chars().count();

        if !current.fields.is_empty()
            && (current.fields.len() == MAX_EMBED_FIELDS
                || current_chars + field_chars > MAX_EMBED_CHARS)
        {
            embeds.push(std::mem::replace(&mut current, new_embed(String::new())));
            current_chars = embed_chars(&current);
        }
        current.fields.push(field);
        current_chars += field_chars;
    }
    embeds.push(current);
    embeds
}

/// Characters Discord counts against [`MAX_EMBED_CHARS`].
pub fn embed_chars(embed: &Embed) -> usize {
    embed.title.chars().count()
        + embed.description.chars().count()
        + embed
            .fields
            .iter()
            .map(|f| f.name.chars().count() + f.value.chars().count())
            .sum::<usize>()
}

/// Posted into the delivery channel right after it is created.
pub fn intro_embed(prefix: &str, at: DateTime<Utc>) -> Embed {
    let how = format!(
        "Anytime before the standup time, members DM me with `{prefix}show`, \
         I present the standup prompt and they answer with a command:\n\
         - Overwrite all your reply with: `{prefix}reply [your-message-here]`\n\
         - Append a task you completed with: `{prefix}task [your-message-here]`\n\
         - Append a plan with: `{prefix}plan [your-message-here]`\n\
         - Append an obstacle that needs follow up with: `{prefix}obstacle [your-message-here]`\n\
         I keep the answers until the standup time and then post everyone's answer here."
    );
    Embed {
        title: SUMMARY_TITLE.into(),
        description: "Daily standups! :tada:".into(),
        color: STANDUP_COLOR,
        fields: vec![
            EmbedField {
                name: "Introduction".into(),
                value: format!(
                    "Hi! I will be facilitating your daily standups from now on.\n\
                     To view all available commands, try `{prefix}help`."
                ),
                inline: false,
            },
            EmbedField {
                name: "How does this work?".into(),
                value: how,
                inline: false,
            },
            EmbedField {
                name: "Getting started".into(),
                value: format!(
                    "*Currently*, there are no members in the standup! To add a member try `{prefix}am <user>`."
                ),
                inline: false,
            },
        ],
        timestamp: Some(at),
    }
}

/// The questions shown by `show`.
pub fn prompt_embed(prefix: &str, at: DateTime<Utc>) -> Embed {
    Embed {
        title: "Standup Prompt".into(),
        description: format!(
            "Answer with `{prefix}reply`, or build it up line by line with \
             `{prefix}task`, `{prefix}plan` and `{prefix}obstacle`."
        ),
        color: STANDUP_COLOR,
        fields: vec![
            EmbedField {
                name: "What did you get done?".into(),
                value: format!("`{prefix}task [your-message-here]`"),
                inline: false,
            },
            EmbedField {
                name: "What will you work on next?".into(),
                value: format!("`{prefix}plan [your-message-here]`"),
                inline: false,
            },
            EmbedField {
                name: "Is anything blocking you?".into(),
                value: format!("`{prefix}obstacle [your-message-here]`"),
                inline: false,
            },
        ],
        timestamp: Some(at),
    }
}

/// Sent before the confirmation when a bare command matched several groups.
pub fn ambiguity_notice(command: &str, prefix: &str, ambiguity: &Ambiguity) -> String {
    format!(
        "Ruh Roh! Looks like you're a member in multiple standup servers ({})!\n\
         Your response went to the first one. Try `{prefix}{command} {GROUP_MARKER}<serverId> [your-message-here]` \
         if you would like to reply to a *specific* standup server.\n\
         **_Crunchy Hint:_** To get the serverId for *any* server, right-click the server icon and press `Copy ID`.",
        ambiguity.group_ids.join(", ")
    )
}

/// Asks the member to move an update command into a DM.
pub fn dm_only(command: &str, prefix: &str) -> String {
    format!("private DM me with `{prefix}{command}` :bomb:")
}

/// Reply for a failed update command. Infrastructure failures get the generic notice.
pub fn resolution_failure(err: &StandbotError) -> String {
    match err {
        StandbotError::EmptyMessage => "Ruh Roh! You must provide a response as a message. \
             No one likes a :ghost: as a team member :exclamation: :anger:"
            .into(),
        StandbotError::GroupNotFound(id) => {
            format!("Ruh Roh! I could not find a standup for server `{id}`.")
        }
        StandbotError::NotAMember(_) => "Ruh Roh! You must be a team member in this server \
             standup to reply to the response!"
            .into(),
        StandbotError::NoMembership => "Ruh Roh! You must be a team member in ***__any__*** \
             server standup to reply to the response!"
            .into(),
        _ => GENERIC_FAILURE.into(),
    }
}
