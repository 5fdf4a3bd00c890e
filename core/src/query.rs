//! Read-only ownership summaries for display.

use std::collections::BTreeMap;

use fairkeep_types::{ClaimBuckets, ContainerId, ItemType, PlayerId};
use serde::Serialize;

use crate::table::OwnershipTable;

/// What a requesting player sees for one item type in one holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipSummary {
    pub total: u32,
    pub owned_by_requester: u32,
    pub unowned: u32,
    pub owned_by_others: BTreeMap<PlayerId, u32>,
    /// Shortest countdown among the requester's pending claims, in seconds.
    pub min_timer_for_requester: Option<u32>,
}

#[must_use]
pub fn summarize_buckets(buckets: &ClaimBuckets, requester: PlayerId) -> OwnershipSummary {
    let mut summary = OwnershipSummary::default();
    for (status, amount) in buckets.iter() {
        summary.total = summary.total.saturating_add(*amount);
        match status.owner() {
            None => summary.unowned = summary.unowned.saturating_add(*amount),
            Some(owner) if owner == requester => {
                summary.owned_by_requester = summary.owned_by_requester.saturating_add(*amount);
            }
            Some(owner) => {
                let units = summary.owned_by_others.entry(owner).or_default();
                *units = units.saturating_add(*amount);
            }
        }
        if let Some(timer) = status.timer().filter(|t| t.claimant == requester) {
            let seconds = timer.remaining.seconds();
            summary.min_timer_for_requester = Some(
                summary
                    .min_timer_for_requester
                    .map_or(seconds, |current| current.min(seconds)),
            );
        }
    }
    summary
}

impl OwnershipTable {
    #[must_use]
    pub fn summarize(&self, id: ContainerId, item: &ItemType, requester: PlayerId) -> OwnershipSummary {
        self.buckets(id, item)
            .map(|buckets| summarize_buckets(buckets, requester))
            .unwrap_or_default()
    }
}
