//! Scheduler engine: the daily summary cycle and the loop that triggers it.
//!
//! One cycle: load every group, then for each group independently build the
//! summary, deliver it, and only after delivery succeeded clear its responses.
//! A group that fails keeps its responses for the next cycle; other groups are
//! unaffected.
//!
//! Large summaries go out as several embeds, in order; the group is cleared
//! only once every one of them was accepted. If a later embed fails the
//! earlier ones stay posted and are posted again on the next cycle.
//!
//! Clearing re-reads the group and removes only the responses that were
//! delivered and are still unchanged, so members added or responses edited
//! while the summary was in flight survive. An edit landing between that
//! re-read and the save is still lost (last write wins at the store).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use standbot_core::error::StandbotError;
use standbot_core::traits::{StandupStore, Transport};
use standbot_core::types::{OutgoingMessage, StandupGroup};
use standbot_engine::aggregate::aggregate;
use standbot_engine::messages::summary_embeds;
use standbot_engine::segment::Segmenter;

use crate::cron::CronSchedule;

/// How one group fared in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Summary delivered and responses cleared.
    Cleared { entries: usize, missing: usize },
    /// Summary delivered but the clear could not be saved.
    ClearFailed(String),
    /// Stored data broke an invariant; nothing was sent.
    Malformed(String),
    /// The delivery channel no longer exists.
    ChannelNotFound(String),
    /// The transport refused the summary.
    DeliveryFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub group_id: String,
    pub outcome: GroupOutcome,
}

/// Result of one trigger; informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Set when the groups could not be loaded; no group was processed.
    pub fetch_error: Option<String>,
    pub groups: Vec<GroupReport>,
}

impl CycleReport {
    pub fn cleared(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Cleared { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.groups.len() - self.cleared()
    }

    pub fn outcome_for(&self, group_id: &str) -> Option<&GroupOutcome> {
        self.groups
            .iter()
            .find(|g| g.group_id == group_id)
            .map(|g| &g.outcome)
    }
}

/// Drives the daily summary cycle.
pub struct SchedulerEngine {
    store: Arc<dyn StandupStore>,
    transport: Arc<dyn Transport>,
    segmenter: Segmenter,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<dyn StandupStore>,
        transport: Arc<dyn Transport>,
        segmenter: Segmenter,
    ) -> Self {
        Self {
            store,
            transport,
            segmenter,
        }
    }

    /// Run one full cycle over every group.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        tracing::info!("[{started_at}] - standup cycle start");

        let groups = match self.store.find_all().await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!("Loading standups failed, skipping this cycle: {e}");
                return CycleReport {
                    started_at,
                    fetch_error: Some(e.to_string()),
                    groups: Vec::new(),
                };
            }
        };

        let reports = join_all(groups.into_iter().map(|g| self.process_group(g))).await;

        let report = CycleReport {
            started_at,
            fetch_error: None,
            groups: reports,
        };
        tracing::info!(
            "Standup cycle done: {} cleared, {} failed",
            report.cleared(),
            report.failed()
        );
        report
    }

    /// Build → deliver → clear for a single group.
    async fn process_group(&self, group: StandupGroup) -> GroupReport {
        let group_id = group.id.clone();
        let outcome = self.deliver_and_clear(&group).await;
        match &outcome {
            GroupOutcome::Cleared { entries, missing } => tracing::info!(
                "[{}] - {} RESPONSES CLEARED ({} entries, {} missing)",
                Utc::now(),
                group_id,
                entries,
                missing
            ),
            GroupOutcome::ClearFailed(e) => {
                tracing::error!("Summary for {group_id} sent but clearing failed: {e}")
            }
            GroupOutcome::Malformed(e) => {
                tracing::error!("Skipping {group_id}: {e}")
            }
            GroupOutcome::ChannelNotFound(channel) => {
                tracing::error!("unable to get channel: {channel} for {group_id}; responses kept")
            }
            GroupOutcome::DeliveryFailed(e) => {
                tracing::error!("unable to send standup for {group_id}; responses kept: {e}")
            }
        }
        GroupReport { group_id, outcome }
    }

    async fn deliver_and_clear(&self, group: &StandupGroup) -> GroupOutcome {
        let built = match aggregate(group, &self.segmenter) {
            Ok(built) => built,
            Err(e) => return GroupOutcome::Malformed(e.to_string()),
        };

        let channel = match self.transport.resolve_channel(&group.delivery_channel).await {
            Ok(channel) => channel,
            Err(StandbotError::ChannelNotFound(id)) => return GroupOutcome::ChannelNotFound(id),
            Err(e) => return GroupOutcome::DeliveryFailed(e.to_string()),
        };

        let embeds = summary_embeds(&built.payload, Utc::now());
        let parts = embeds.len();
        for (i, embed) in embeds.into_iter().enumerate() {
            let message = OutgoingMessage::Embed(embed);
            if let Err(e) = self.transport.send_to_channel(&channel, &message).await {
                return GroupOutcome::DeliveryFailed(format!("part {}/{parts}: {e}", i + 1));
            }
        }
        tracing::debug!("sent daily standup summary to {} in {parts} part(s)", channel.id);

        let outcome = GroupOutcome::Cleared {
            entries: built.payload.entries.len(),
            missing: built.payload.missing.len(),
        };
        let mut current = match self.store.find_by_id(&group.id).await {
            Ok(Some(current)) => current,
            // Removed while we were sending; nothing left to clear.
            Ok(None) => return outcome,
            Err(e) => return GroupOutcome::ClearFailed(e.to_string()),
        };
        if current.clear_delivered(&built.delivered) == 0 {
            return outcome;
        }
        match self.store.save(&current).await {
            Ok(()) => outcome,
            Err(e) => GroupOutcome::ClearFailed(e.to_string()),
        }
    }
}

/// Spawn the scheduler loop: sleep until the next trigger, run a cycle, repeat.
/// Cycles never overlap. Returns only if the schedule has no future trigger.
pub async fn spawn_scheduler(engine: Arc<SchedulerEngine>, schedule: CronSchedule) {
    tracing::info!("⏰ Scheduler started ('{}')", schedule.expression());

    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            tracing::warn!("'{}' never fires again, scheduler stopping", schedule.expression());
            return;
        };
        tracing::debug!("next standup cycle at {next}");

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        engine.run_cycle().await;
    }
}
