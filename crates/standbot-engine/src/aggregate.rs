//! Aggregation: turns one group's responses into a summary payload.

use std::collections::BTreeMap;

use standbot_core::error::Result;
use standbot_core::types::{StandupGroup, SummaryEntry, SummaryPayload};

use crate::segment::Segmenter;

pub const NOBODY_MISSED: &str = "Nobody missed the standup: :man_shrugging:";
pub const MISSED_BY: &str = "Whoops, standup was missed by: ";

/// A built summary plus the responses it consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub payload: SummaryPayload,
    /// member id -> response text, exactly as summarized. Cleared once delivered.
    pub delivered: BTreeMap<String, String>,
}

/// Build the summary for `group`, walking members in stored order.
///
/// Fails only when the stored group is malformed (see [`StandupGroup::validate`]).
pub fn aggregate(group: &StandupGroup, segmenter: &Segmenter) -> Result<Aggregate> {
    group.validate()?;

    let mut delivered = BTreeMap::new();
    let mut missing = Vec::new();
    let mut entries = Vec::new();

    for member_id in &group.members {
        let Some(response) = group.response(member_id) else {
            missing.push(member_id.clone());
            continue;
        };
        entries.extend(segmenter.segment(response).into_iter().map(|text| SummaryEntry {
            member_id: member_id.clone(),
            text,
        }));
        delivered.insert(member_id.clone(), response.to_string());
    }

    Ok(Aggregate {
        payload: SummaryPayload {
            missing_notice: missing_notice(&missing),
            missing,
            entries,
        },
        delivered,
    })
}

/// The summary description line: who did not answer, or that everyone did.
pub fn missing_notice(missing: &[String]) -> String {
    if missing.is_empty() {
        return NOBODY_MISSED.to_string();
    }
    let mut notice = MISSED_BY.to_string();
    for id in missing {
        notice.push_str(&format!("<@{id}> "));
    }
    notice
}
