//! Composition root for fairkeep.
//!
//! [`Engine`] owns the ownership table together with the pieces that need a
//! clock: the periodic claim aging, the drop-provenance handoff, deferred
//! fallbacks and ender storage sessions. Every method runs on the simulation
//! thread; only the handoff waiters live on the tokio runtime.

mod ender_sessions;
mod handoff;
mod scheduler;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fairkeep_core::{HeldCursor, LiveContainer, OwnershipTable};
use fairkeep_store::SnapshotStore;
use fairkeep_types::settings::EngineSettings;
use fairkeep_types::{
    BlockPos, ClaimBuckets, ClaimOrder, ContainerId, EntityId, FRESH_CLAIM_SECONDS, ItemType,
    PlayerId,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use ender_sessions::EnderSessions;
pub use handoff::{DropHandoff, DropRequest, HandoffResolution};
pub use scheduler::{DeferredTask, Scheduler};

pub struct Engine {
    table: OwnershipTable,
    settings: EngineSettings,
    scheduler: Scheduler,
    handoff: DropHandoff,
    ender: EnderSessions,
}

impl Engine {
    /// `runtime` hosts the drop handoff waiters.
    #[must_use]
    pub fn new(settings: EngineSettings, runtime: Handle) -> Self {
        Self {
            table: OwnershipTable::new(),
            settings,
            scheduler: Scheduler::new(),
            handoff: DropHandoff::new(settings.handoff, runtime),
            ender: EnderSessions::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &OwnershipTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut OwnershipTable {
        &mut self.table
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Simulation ticks seen so far.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.scheduler.now()
    }

    #[must_use]
    pub fn ender_sessions(&self) -> &EnderSessions {
        &self.ender
    }

    /// Advance one simulation tick.
    ///
    /// Applies finished handoffs, runs deferred work that is due and, every
    /// `interval_ticks`, ages claims in online players' main containers and
    /// in all ender storage.
    pub fn on_tick(&mut self, is_online: impl Fn(PlayerId) -> bool) {
        let due = self.scheduler.advance();
        for resolution in self.handoff.drain_resolved() {
            self.apply_resolution(resolution);
        }
        for task in due {
            self.run(task);
        }

        let ticking = self.settings.ticking;
        if self.scheduler.now() % ticking.interval_ticks() == 0 {
            self.table
                .tick_player_inventories(ticking.player_seconds(), &is_online);
            self.table.tick_ender_storage(ticking.ender_seconds());
        }
    }

    fn apply_resolution(&mut self, resolution: HandoffResolution) {
        match resolution {
            HandoffResolution::Resolved {
                request,
                mut buckets,
            } => {
                debug!(
                    player = %request.player,
                    entity = %request.entity,
                    units = buckets.total(),
                    "drop provenance resolved"
                );
                buckets.apply_order(ClaimOrder::SharedTake);
                self.table.set_world_item(request.entity, buckets);
            }
            HandoffResolution::Fallback { request } => {
                let delay = self.settings.handoff.fallback_delay_ticks();
                debug!(
                    player = %request.player,
                    entity = %request.entity,
                    delay,
                    "drop provenance timed out; attributing from staging"
                );
                self.scheduler.schedule_in(
                    delay,
                    DeferredTask::InstantiateStaged {
                        player: request.player,
                        entity: request.entity,
                        item: request.item,
                        amount: request.amount,
                    },
                );
            }
        }
    }

    fn run(&mut self, task: DeferredTask) {
        match task {
            DeferredTask::InstantiateStaged {
                player,
                entity,
                item,
                amount,
            } => {
                let attributed = self.table.instantiate_staged(player, entity, &item, amount);
                if attributed < amount {
                    debug!(%player, %entity, %item, amount, attributed, "staging held fewer units than dropped");
                }
            }
            DeferredTask::MergeWorldItems { removed, target } => {
                self.table.merge_world_items(removed, target);
            }
        }
    }

    // ------------------------------------------------------------------
    // Drops
    // ------------------------------------------------------------------

    /// An item entity spawned from a player drop. Waits for the click side
    /// to publish what was released.
    pub fn begin_drop(&mut self, request: DropRequest) -> Option<JoinHandle<()>> {
        self.handoff.await_drop(request)
    }

    /// Hand a released partition to the spawn side. Units the handoff cannot
    /// take are staged for the fallback instead.
    pub fn publish_drop(&mut self, player: PlayerId, item: ItemType, buckets: ClaimBuckets) {
        if buckets.is_empty() {
            return;
        }
        if !self.handoff.publish(player, buckets.clone()) {
            self.table.stage_dropped(player, item, buckets);
        }
    }

    /// Drop the held cursor, whole or one unit, and publish what left it.
    pub fn drop_cursor(&mut self, player: PlayerId, whole: bool) -> Option<HeldCursor> {
        let released = if whole {
            self.table.drop_cursor_all(player)
        } else {
            self.table.drop_cursor_one(player)
        }?;
        self.publish_drop(player, released.item.clone(), released.buckets.clone());
        Some(released)
    }

    /// Units dropped straight out of a container slot.
    pub fn drop_from_slot(
        &mut self,
        live: &dyn LiveContainer,
        player: PlayerId,
        item: &ItemType,
        amount: Option<u32>,
    ) -> ClaimBuckets {
        let lost = self.table.sync_item_lost(live, item, amount);
        self.publish_drop(player, item.clone(), lost.clone());
        lost
    }

    /// The host merged `removed` into `target`. Applied on the next tick so
    /// a pending handoff for `removed` lands first.
    pub fn merge_item_entities(&mut self, removed: EntityId, target: EntityId) {
        self.scheduler
            .schedule_in(1, DeferredTask::MergeWorldItems { removed, target });
    }

    pub fn player_quit(&mut self, player: PlayerId) {
        self.handoff.forget(player);
    }

    /// Strip everything the dying player does not own out of their main
    /// container. Returns what the host should drop into the world.
    pub fn handle_death(&mut self, main: &mut dyn LiveContainer) -> BTreeMap<ItemType, u32> {
        let Some(player) = main.id().player() else {
            return BTreeMap::new();
        };
        let dropped = self
            .table
            .remove_items(main, |status| !status.is_owned_by(player));
        info!(%player, item_types = dropped.len(), "removed unowned items on death");
        dropped
    }

    // ------------------------------------------------------------------
    // Ender storage sessions
    // ------------------------------------------------------------------

    pub fn ender_opened(&mut self, pos: BlockPos, player: PlayerId, now: DateTime<Utc>) {
        self.ender.opened(pos, player, now);
    }

    /// Returns whether the player's ender storage was aged.
    pub fn ender_closed(&mut self, pos: BlockPos, player: PlayerId, now: DateTime<Utc>) -> bool {
        if !self.ender.closed(pos, player, now) {
            return false;
        }
        self.table
            .tick_container(ContainerId::ender(player), FRESH_CLAIM_SECONDS);
        true
    }

    pub fn ender_block_removed(&mut self, pos: BlockPos) {
        self.ender.block_removed(pos);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn persist(&self, store: &mut SnapshotStore) -> Result<()> {
        store.save(&self.table.snapshot())?;
        store.save_sessions(&self.ender.encode())?;
        Ok(())
    }

    /// Replace table and session state with what `store` holds.
    pub fn load(&mut self, store: &SnapshotStore) -> Result<()> {
        let snapshot = store.load()?;
        self.table
            .restore(&snapshot)
            .context("Stored ownership snapshot is malformed")?;
        if let Some(data) = store.load_sessions()? {
            self.ender = EnderSessions::decode(&data);
        }
        Ok(())
    }
}
