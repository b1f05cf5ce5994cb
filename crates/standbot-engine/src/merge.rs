//! Response merge engine: applies an update command to a member's stored response.

use standbot_core::types::StandupGroup;

/// How an update command changes the stored response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatePolicy {
    /// `!reply`: replace the whole response.
    Overwrite,
    /// `!task`: append a completed task.
    AppendTask,
    /// `!plan`: append a plan for today.
    AppendPlan,
    /// `!obstacle`: append a blocker.
    AppendObstacle,
}

impl UpdatePolicy {
    /// Prefix written in front of appended lines; `None` for overwrite.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            UpdatePolicy::Overwrite => None,
            UpdatePolicy::AppendTask => Some("I completed a task: "),
            UpdatePolicy::AppendPlan => Some("I plan to: "),
            UpdatePolicy::AppendObstacle => Some("I faced an obstacle: "),
        }
    }
}

impl std::fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdatePolicy::Overwrite => write!(f, "overwrite"),
            UpdatePolicy::AppendTask => write!(f, "task"),
            UpdatePolicy::AppendPlan => write!(f, "plan"),
            UpdatePolicy::AppendObstacle => write!(f, "obstacle"),
        }
    }
}

/// Apply `policy` with `text` to `member_id`'s response and return the updated group.
///
/// Appends always add exactly one line: line breaks inside `text` are folded
/// into spaces. No length checks happen here; long responses are split at
/// summary time. Saving the result is up to the caller.
pub fn merge(
    mut group: StandupGroup,
    member_id: &str,
    policy: UpdatePolicy,
    text: &str,
) -> StandupGroup {
    let updated = match policy.label() {
        None => text.trim().to_string(),
        Some(label) => {
            let current = group.response(member_id).unwrap_or("");
            format!("{current}\n{label}{}", single_line(text)).trim().to_string()
        }
    };
    group.responses.insert(member_id.to_string(), updated);
    group
}

/// Join the lines of `text` with single spaces.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
