//! Membership resolver: picks the one standup group an update command applies to.
//!
//! A command may name its group explicitly (`!task @<groupId> text`) or rely on
//! the member belonging to exactly one group. Belonging to several groups is not
//! an error: the first group wins and the result carries an [`Ambiguity`] so the
//! caller can tell the member how to be explicit next time.

use standbot_core::error::{Result, StandbotError};
use standbot_core::traits::StandupStore;
use standbot_core::types::StandupGroup;

/// Marks the first argument as an explicit group id.
pub const GROUP_MARKER: char = '@';

/// Where the command wants its text to go, before any store lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Explicit { group_id: String, message: String },
    Implicit { message: String },
}

/// Set when a bare command matched more than one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// Every matching group id, in enumeration order; the first was chosen.
    pub group_ids: Vec<String>,
}

/// The group a command resolved to plus its message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub group: StandupGroup,
    pub message: String,
    pub ambiguity: Option<Ambiguity>,
}

/// Split the command arguments into an optional group token and message text.
pub fn parse_target(args: &[String]) -> Result<Target> {
    let Some(first) = args.first() else {
        return Err(StandbotError::EmptyMessage);
    };

    match first.strip_prefix(GROUP_MARKER) {
        Some(group_id) => {
            if args.len() == 1 {
                return Err(StandbotError::EmptyMessage);
            }
            Ok(Target::Explicit {
                group_id: group_id.to_string(),
                message: args[1..].join(" "),
            })
        }
        None => Ok(Target::Implicit {
            message: args.join(" "),
        }),
    }
}

/// Resolve against an explicitly named group (`None` when the lookup found nothing).
///
/// A member absent from the named group is rejected with `NotAMember`.
pub fn resolve_explicit(
    member_id: &str,
    group_id: &str,
    group: Option<StandupGroup>,
    message: String,
) -> Result<ResolvedTarget> {
    let group = group.ok_or_else(|| StandbotError::GroupNotFound(group_id.to_string()))?;
    if !group.is_member(member_id) {
        return Err(StandbotError::NotAMember(group.id));
    }
    Ok(ResolvedTarget {
        group,
        message,
        ambiguity: None,
    })
}

/// Resolve a bare command by scanning every group for the member.
pub fn resolve_among(
    member_id: &str,
    groups: Vec<StandupGroup>,
    message: String,
) -> Result<ResolvedTarget> {
    let mut matches: Vec<StandupGroup> = groups
        .into_iter()
        .filter(|g| g.is_member(member_id))
        .collect();

    if matches.is_empty() {
        return Err(StandbotError::NoMembership);
    }

    let ambiguity = (matches.len() > 1).then(|| Ambiguity {
        group_ids: matches.iter().map(|g| g.id.clone()).collect(),
    });

    Ok(ResolvedTarget {
        group: matches.swap_remove(0),
        message,
        ambiguity,
    })
}

/// Resolve over an in-memory snapshot of all groups.
pub fn resolve(member_id: &str, args: &[String], groups: &[StandupGroup]) -> Result<ResolvedTarget> {
    match parse_target(args)? {
        Target::Explicit { group_id, message } => {
            let group = groups.iter().find(|g| g.id == group_id).cloned();
            resolve_explicit(member_id, &group_id, group, message)
        }
        Target::Implicit { message } => resolve_among(member_id, groups.to_vec(), message),
    }
}

/// Resolve using the store: a point lookup for explicit targets, a full scan otherwise.
pub async fn resolve_in_store(
    store: &dyn StandupStore,
    member_id: &str,
    args: &[String],
) -> Result<ResolvedTarget> {
    match parse_target(args)? {
        Target::Explicit { group_id, message } => {
            let group = store.find_by_id(&group_id).await?;
            resolve_explicit(member_id, &group_id, group, message)
        }
        Target::Implicit { message } => {
            let groups = store.find_all().await?;
            resolve_among(member_id, groups, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_empty_message() {
        let groups = vec![group("g1", &["u1"])];
        assert!(matches!(
            resolve("u1", &[], &groups),
            Err(StandbotError::EmptyMessage)
        ));
        assert!(matches!(
            resolve("u1", &args("@g1"), &groups),
            Err(StandbotError::EmptyMessage)
        ));
    }

    #[test]
    fn test_single_membership_resolves() {
        let groups = vec![group("g1", &["u2"]), group("g2", &["u1", "u2"])];
        let target = resolve("u1", &args("fixed the login bug"), &groups).unwrap();
        assert_eq!(target.group.id, "g2");
        assert_eq!(target.message, "fixed the login bug");
        assert!(target.ambiguity.is_none());
    }

    #[test]
    fn test_no_membership() {
        let groups = vec![group("g1", &["u2"])];
        assert!(matches!(
            resolve("u1", &args("hello"), &groups),
            Err(StandbotError::NoMembership)
        ));
        assert!(matches!(
            resolve("u1", &args("hello"), &[]),
            Err(StandbotError::NoMembership)
        ));
    }

    #[test]
    fn test_multiple_memberships_pick_first() {
        let groups = vec![
            group("g1", &["u1"]),
            group("g2", &["u3"]),
            group("g3", &["u1"]),
        ];
        let target = resolve("u1", &args("shipped it"), &groups).unwrap();
        assert_eq!(target.group.id, "g1");
        assert_eq!(
            target.ambiguity,
            Some(Ambiguity {
                group_ids: vec!["g1".into(), "g3".into()]
            })
        );
    }

    #[test]
    fn test_explicit_group() {
        let groups = vec![group("g1", &["u1"]), group("g2", &["u1"])];
        let target = resolve("u1", &args("@g2 wrote docs"), &groups).unwrap();
        assert_eq!(target.group.id, "g2");
        assert_eq!(target.message, "wrote docs");
        assert!(target.ambiguity.is_none());
    }

    #[test]
    fn test_explicit_group_not_found() {
        let groups = vec![group("g1", &["u1"])];
        match resolve("u1", &args("@nope hi"), &groups) {
            Err(StandbotError::GroupNotFound(id)) => assert_eq!(id, "nope"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_group_rejects_non_member() {
        let groups = vec![group("g1", &["u2"])];
        match resolve("u1", &args("@g1 hi"), &groups) {
            Err(StandbotError::NotAMember(id)) => assert_eq!(id, "g1"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target(&args("@g1 a b")).unwrap(),
            Target::Explicit {
                group_id: "g1".into(),
                message: "a b".into()
            }
        );
        assert_eq!(
            parse_target(&args("a @g1")).unwrap(),
            Target::Implicit {
                message: "a @g1".into()
            }
        );
    }
}
