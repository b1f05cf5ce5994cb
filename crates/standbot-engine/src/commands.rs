//! Chat commands and the registry that holds them.
//!
//! The registry is built explicitly and handed to the bot; there is no global
//! command table.

use async_trait::async_trait;
use chrono::Utc;
use standbot_core::error::Result;
use standbot_core::traits::StandupStore;
use standbot_core::types::{IncomingMessage, OutgoingMessage};

use crate::merge::{UpdatePolicy, merge};
use crate::messages;
use crate::resolver::resolve_in_store;

/// Everything a command needs to run.
pub struct CommandContext<'a> {
    pub message: &'a IncomingMessage,
    /// Arguments after the command name, split on spaces.
    pub args: Vec<String>,
    pub prefix: &'a str,
    pub store: &'a dyn StandupStore,
    pub registry: &'a CommandRegistry,
}

/// A chat command. Returns the replies to post in the invoking channel.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn usage(&self) -> &str;
    fn description(&self) -> &str;
    /// Refuse to run in direct messages.
    fn guild_only(&self) -> bool {
        false
    }
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>>;
}

/// The commands a bot instance answers to.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standup command set.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(UpdateCommand::new(
            "reply",
            UpdatePolicy::Overwrite,
            "Overwrite your whole standup reply",
        )));
        registry.register(Box::new(UpdateCommand::new(
            "task",
            UpdatePolicy::AppendTask,
            "Add a completed task to your reply",
        )));
        registry.register(Box::new(UpdateCommand::new(
            "plan",
            UpdatePolicy::AppendPlan,
            "Add a plan to your reply",
        )));
        registry.register(Box::new(UpdateCommand::new(
            "obstacle",
            UpdatePolicy::AppendObstacle,
            "Add an obstacle to your reply",
        )));
        registry.register(Box::new(ShowCommand));
        registry.register(Box::new(HelpCommand));
        registry.register(Box::new(AddMemberCommand));
        registry.register(Box::new(RemoveMemberCommand));
        registry.register(Box::new(MembersCommand));
        registry
    }

    /// Add a command; a later command with the same name replaces the earlier one.
    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.retain(|c| c.name() != command.name());
        self.commands.push(command);
    }

    pub fn find(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn text(s: impl Into<String>) -> OutgoingMessage {
    OutgoingMessage::Text(s.into())
}

// ─── Update commands ──────────────────────────────────────

/// `reply`, `task`, `plan`, `obstacle`: resolve the group, merge, save.
pub struct UpdateCommand {
    name: &'static str,
    policy: UpdatePolicy,
    description: &'static str,
}

impl UpdateCommand {
    pub fn new(name: &'static str, policy: UpdatePolicy, description: &'static str) -> Self {
        Self {
            name,
            policy,
            description,
        }
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }
}

#[async_trait]
impl Command for UpdateCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn usage(&self) -> &str {
        "[@serverId] [your-message-here]"
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>> {
        if !ctx.message.is_private() {
            return Ok(vec![text(messages::dm_only(self.name, ctx.prefix))]);
        }

        let member_id = &ctx.message.author_id;
        let target = match resolve_in_store(ctx.store, member_id, &ctx.args).await {
            Ok(target) => target,
            Err(e) => {
                if !e.is_user_error() {
                    tracing::error!("Resolving '{}' for {} failed: {e}", self.name, member_id);
                }
                return Ok(vec![text(messages::resolution_failure(&e))]);
            }
        };

        let mut replies = Vec::new();
        if let Some(ambiguity) = &target.ambiguity {
            replies.push(text(messages::ambiguity_notice(
                self.name, ctx.prefix, ambiguity,
            )));
        }

        let group_id = target.group.id.clone();
        let updated = merge(target.group, member_id, self.policy, &target.message);
        match ctx.store.save(&updated).await {
            Ok(()) => {
                tracing::debug!("{} response updated for {} in {}", self.policy, member_id, group_id);
                replies.push(text(messages::UPDATED));
            }
            Err(e) => {
                tracing::error!("Saving response for {} in {} failed: {e}", member_id, group_id);
                replies.push(text(messages::GENERIC_FAILURE));
            }
        }
        Ok(replies)
    }
}

// ─── Informational commands ──────────────────────────────────────

/// `show`: the standup prompt.
pub struct ShowCommand;

#[async_trait]
impl Command for ShowCommand {
    fn name(&self) -> &str {
        "show"
    }

    fn usage(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        "Show the standup prompt"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>> {
        Ok(vec![OutgoingMessage::Embed(messages::prompt_embed(
            ctx.prefix,
            Utc::now(),
        ))])
    }
}

/// `help`: list every registered command.
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn usage(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        "List all available commands"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>> {
        let mut out = String::from("Here's a list of all my commands:\n");
        for command in ctx.registry.iter() {
            let usage = match command.usage() {
                "" => String::new(),
                u => format!(" {u}"),
            };
            let scope = if command.guild_only() { " (server only)" } else { "" };
            out.push_str(&format!(
                "`{}{}{}` - {}{}\n",
                ctx.prefix,
                command.name(),
                usage,
                command.description(),
                scope
            ));
        }
        Ok(vec![text(out.trim_end())])
    }
}

// ─── Membership commands ──────────────────────────────────────

/// `am @user...`: add members to this server's standup.
pub struct AddMemberCommand;

#[async_trait]
impl Command for AddMemberCommand {
    fn name(&self) -> &str {
        "am"
    }

    fn usage(&self) -> &str {
        "@<user> [@<user>...]"
    }

    fn description(&self) -> &str {
        "Add members to this server's standup"
    }

    fn guild_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>> {
        update_membership(ctx, |group, id| group.add_member(id), "Added", "already members").await
    }
}

/// `rm @user...`: remove members (and their pending responses).
pub struct RemoveMemberCommand;

#[async_trait]
impl Command for RemoveMemberCommand {
    fn name(&self) -> &str {
        "rm"
    }

    fn usage(&self) -> &str {
        "@<user> [@<user>...]"
    }

    fn description(&self) -> &str {
        "Remove members from this server's standup"
    }

    fn guild_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>> {
        update_membership(ctx, |group, id| group.remove_member(id), "Removed", "not members").await
    }
}

async fn update_membership<F>(
    ctx: &CommandContext<'_>,
    mut apply: F,
    verb: &str,
    unchanged: &str,
) -> Result<Vec<OutgoingMessage>>
where
    F: FnMut(&mut standbot_core::types::StandupGroup, &str) -> bool + Send,
{
    let Some(group_id) = ctx.message.guild_id.as_deref() else {
        return Ok(vec![text(messages::GUILD_ONLY)]);
    };
    if ctx.message.mentions.is_empty() {
        return Ok(vec![text(
            "Ruh Roh! Mention the members you mean, e.g. `@someone`.",
        )]);
    }

    let Some(mut group) = ctx.store.find_by_id(group_id).await? else {
        return Ok(vec![text(
            "Ruh Roh! This server has no standup yet. Try re-inviting me.",
        )]);
    };

    let mut changed = Vec::new();
    let mut skipped = Vec::new();
    for id in &ctx.message.mentions {
        if apply(&mut group, id) {
            changed.push(format!("<@{id}>"));
        } else {
            skipped.push(format!("<@{id}>"));
        }
    }

    if !changed.is_empty() {
        ctx.store.save(&group).await?;
        tracing::info!("{} {} member(s) in {}", verb, changed.len(), group_id);
    }

    let mut reply = String::new();
    if !changed.is_empty() {
        reply.push_str(&format!("{verb}: {}", changed.join(" ")));
    }
    if !skipped.is_empty() {
        if !reply.is_empty() {
            reply.push('\n');
        }
        reply.push_str(&format!("Skipped ({unchanged}): {}", skipped.join(" ")));
    }
    Ok(vec![text(reply)])
}

/// `members`: list this server's standup members in summary order.
pub struct MembersCommand;

#[async_trait]
impl Command for MembersCommand {
    fn name(&self) -> &str {
        "members"
    }

    fn usage(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        "List this server's standup members"
    }

    fn guild_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>> {
        let Some(group_id) = ctx.message.guild_id.as_deref() else {
            return Ok(vec![text(messages::GUILD_ONLY)]);
        };
        let reply = match ctx.store.find_by_id(group_id).await? {
            Some(group) if !group.members.is_empty() => {
                let mentions: Vec<String> =
                    group.members.iter().map(|m| format!("<@{m}>")).collect();
                format!("Standup members: {}", mentions.join(" "))
            }
            Some(_) => format!(
                "There are no members in the standup! To add a member try `{}am <user>`.",
                ctx.prefix
            ),
            None => "Ruh Roh! This server has no standup yet. Try re-inviting me.".into(),
        };
        Ok(vec![text(reply)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standbot_core::error::StandbotError;
    use standbot_core::memory::MemoryStore;
    use standbot_core::types::StandupGroup;

    fn dm(author: &str) -> IncomingMessage {
        IncomingMessage {
            author_id: author.into(),
            author_is_bot: false,
            channel_id: format!("dm-{author}"),
            guild_id: None,
            content: String::new(),
            mentions: vec![],
            mentions_bot: false,
        }
    }

    fn in_guild(author: &str, guild: &str, mentions: &[&str]) -> IncomingMessage {
        IncomingMessage {
            guild_id: Some(guild.into()),
            channel_id: "general".into(),
            mentions: mentions.iter().map(|m| m.to_string()).collect(),
            ..dm(author)
        }
    }

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn group(id: &str, members: &[&str]) -> StandupGroup {
        let mut g = StandupGroup::new(id, format!("chan-{id}"));
        for m in members {
            g.add_member(m);
        }
        g
    }

    async fn run(
        registry: &CommandRegistry,
        store: &dyn StandupStore,
        name: &str,
        message: &IncomingMessage,
        a: &str,
    ) -> Vec<OutgoingMessage> {
        let ctx = CommandContext {
            message,
            args: args(a),
            prefix: "!",
            store,
            registry,
        };
        registry.find(name).unwrap().execute(&ctx).await.unwrap()
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl StandupStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }
        async fn find_by_id(&self, id: &str) -> Result<Option<StandupGroup>> {
            self.0.find_by_id(id).await
        }
        async fn find_all(&self) -> Result<Vec<StandupGroup>> {
            self.0.find_all().await
        }
        async fn save(&self, _group: &StandupGroup) -> Result<()> {
            Err(StandbotError::Store("read-only".into()))
        }
        async fn delete_by_id(&self, _id: &str) -> Result<()> {
            Err(StandbotError::Store("read-only".into()))
        }
    }

    #[test]
    fn test_standard_registry() {
        let registry = CommandRegistry::standard();
        for name in ["reply", "task", "plan", "obstacle", "show", "help", "am", "rm", "members"] {
            assert!(registry.find(name).is_some(), "missing {name}");
        }
        assert!(registry.find("am").unwrap().guild_only());
        assert!(!registry.find("task").unwrap().guild_only());
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(ShowCommand));
        registry.register(Box::new(ShowCommand));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_update_saves_response() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u1"])]);

        let replies = run(&registry, &store, "task", &dm("u1"), "wrote the parser").await;
        assert_eq!(replies, vec![text(messages::UPDATED)]);

        let saved = store.find_by_id("g1").await.unwrap().unwrap();
        assert_eq!(saved.response("u1"), Some("I completed a task: wrote the parser"));
    }

    #[tokio::test]
    async fn test_update_requires_dm() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u1"])]);

        let replies = run(&registry, &store, "reply", &in_guild("u1", "g1", &[]), "hi").await;
        assert_eq!(replies, vec![text(messages::dm_only("reply", "!"))]);
        assert!(store.find_by_id("g1").await.unwrap().unwrap().responses.is_empty());
    }

    #[tokio::test]
    async fn test_update_reports_ambiguity_first() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u1"]), group("g2", &["u1"])]);

        let replies = run(&registry, &store, "plan", &dm("u1"), "ship it").await;
        assert_eq!(replies.len(), 2);
        assert!(matches!(&replies[0], OutgoingMessage::Text(t) if t.contains("multiple standup servers")));
        assert_eq!(replies[1], text(messages::UPDATED));

        assert!(store.find_by_id("g1").await.unwrap().unwrap().response("u1").is_some());
        assert!(store.find_by_id("g2").await.unwrap().unwrap().response("u1").is_none());
    }

    #[tokio::test]
    async fn test_update_resolution_errors_reply() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u2"])]);

        let replies = run(&registry, &store, "reply", &dm("u1"), "hello").await;
        assert_eq!(
            replies,
            vec![text(messages::resolution_failure(&StandbotError::NoMembership))]
        );

        let replies = run(&registry, &store, "reply", &dm("u2"), "@g1").await;
        assert_eq!(
            replies,
            vec![text(messages::resolution_failure(&StandbotError::EmptyMessage))]
        );
    }

    #[tokio::test]
    async fn test_update_unknown_explicit_group() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u1"])]);

        let replies = run(&registry, &store, "task", &dm("u1"), "@nope fixed CI").await;
        assert_eq!(
            replies,
            vec![text(messages::resolution_failure(&StandbotError::GroupNotFound(
                "nope".into()
            )))]
        );
        assert!(store.find_by_id("nope").await.unwrap().is_none());
        assert!(store.find_by_id("g1").await.unwrap().unwrap().responses.is_empty());
    }

    #[tokio::test]
    async fn test_update_explicit_group_requires_membership() {
        let registry = CommandRegistry::standard();
        // Any save attempt would surface as the generic failure instead.
        let store = ReadOnlyStore(MemoryStore::with_groups(vec![
            group("g1", &["u1"]),
            group("g2", &["u2"]),
        ]));

        let replies = run(&registry, &store, "task", &dm("u1"), "@g2 fixed CI").await;
        assert_eq!(
            replies,
            vec![text(messages::resolution_failure(&StandbotError::NotAMember(
                "g2".into()
            )))]
        );
        assert!(store.find_by_id("g2").await.unwrap().unwrap().responses.is_empty());
    }

    #[tokio::test]
    async fn test_update_store_failure_is_generic() {
        let registry = CommandRegistry::standard();
        let store = ReadOnlyStore(MemoryStore::with_groups(vec![group("g1", &["u1"])]));

        let replies = run(&registry, &store, "obstacle", &dm("u1"), "VPN down").await;
        assert_eq!(replies, vec![text(messages::GENERIC_FAILURE)]);
    }

    #[tokio::test]
    async fn test_add_and_remove_members() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u1"])]);

        let replies = run(&registry, &store, "am", &in_guild("admin", "g1", &["u2", "u1"]), "").await;
        assert_eq!(
            replies,
            vec![text("Added: <@u2>\nSkipped (already members): <@u1>")]
        );
        assert_eq!(
            store.find_by_id("g1").await.unwrap().unwrap().members,
            vec!["u1", "u2"]
        );

        let mut g = store.find_by_id("g1").await.unwrap().unwrap();
        g.responses.insert("u1".into(), "pending".into());
        store.save(&g).await.unwrap();

        run(&registry, &store, "rm", &in_guild("admin", "g1", &["u1"]), "").await;
        let g = store.find_by_id("g1").await.unwrap().unwrap();
        assert_eq!(g.members, vec!["u2"]);
        assert!(g.responses.is_empty());
    }

    #[tokio::test]
    async fn test_members_listing() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::with_groups(vec![group("g1", &["u2", "u1"]), group("g2", &[])]);

        let replies = run(&registry, &store, "members", &in_guild("x", "g1", &[]), "").await;
        assert_eq!(replies, vec![text("Standup members: <@u2> <@u1>")]);

        let replies = run(&registry, &store, "members", &in_guild("x", "g2", &[]), "").await;
        assert!(matches!(&replies[0], OutgoingMessage::Text(t) if t.contains("no members")));
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let registry = CommandRegistry::standard();
        let store = MemoryStore::new();
        let replies = run(&registry, &store, "help", &dm("u1"), "").await;
        let OutgoingMessage::Text(help) = &replies[0] else {
            panic!("help should be text");
        };
        assert!(help.contains("`!obstacle [@serverId] [your-message-here]`"));
        assert!(help.contains("`!am @<user> [@<user>...]` - Add members to this server's standup (server only)"));
    }
}
