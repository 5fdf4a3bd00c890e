//! Tick-based deferral for work that must run a few simulation ticks later.

use std::collections::BTreeMap;
use std::mem;

use fairkeep_types::{EntityId, ItemType, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// Attribute staged units to a spawned entity whose handoff timed out.
    InstantiateStaged {
        player: PlayerId,
        entity: EntityId,
        item: ItemType,
        amount: u32,
    },
    /// Fold a merged-away item entity into its survivor.
    MergeWorldItems { removed: EntityId, target: EntityId },
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    pending: BTreeMap<u64, Vec<DeferredTask>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Queue `task` to run `delay_ticks` after the current tick. A zero delay
    /// runs on the next advance.
    pub fn schedule_in(&mut self, delay_ticks: u64, task: DeferredTask) {
        let due = self.now.saturating_add(delay_ticks.max(1));
        self.pending.entry(due).or_default().push(task);
    }

    /// Advance one tick and return the tasks now due, in scheduling order.
    pub fn advance(&mut self) -> Vec<DeferredTask> {
        self.now = self.now.saturating_add(1);
        let later = self.pending.split_off(&(self.now + 1));
        let due = mem::replace(&mut self.pending, later);
        due.into_values().flatten().collect()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}
