//! The ownership table.
//!
//! Tracks, per container and item type, which claim statuses the units in
//! that container carry. The host moves units around without asking; every
//! operation here reconciles the bookkeeping against what the host reports
//! after the fact.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use fairkeep_types::{
    ClaimBuckets, ClaimOrder, ClaimStatus, ContainerId, EntityId, ItemType, PlayerId,
    PlayerView, claim_buckets,
};
use tracing::debug;

use crate::live::LiveContainer;

/// How `sync_item_get` decides what was gained.
#[derive(Debug, Clone)]
pub enum Gain {
    /// Amount is `actual - tracked`; status follows the container's front bucket.
    Inferred,
    /// Explicit amount; status inferred.
    Amount(u32),
    /// Explicit status; amount is `actual - tracked`.
    Status(ClaimStatus),
    /// Explicit `status -> amount` partition.
    Partition(ClaimBuckets),
}

/// Result of reconciling a move between two containers.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Source and destination are the same container.
    SameContainer,
    /// Neither side tracked the item; both were reconciled from scratch.
    Retracked,
    Moved {
        /// Units drained from the source.
        lost: u32,
        /// Units the destination gained over its tracked total.
        gained: u32,
        /// Units credited with their source status.
        matched: u32,
        /// Partition removed from the source, in source drop order.
        removed: ClaimBuckets,
        /// Partition added to the destination, in destination take order.
        credited: ClaimBuckets,
    },
}

/// Units a player is holding on the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldCursor {
    pub item: ItemType,
    pub buckets: ClaimBuckets,
}

type ItemBuckets = HashMap<ItemType, ClaimBuckets>;

#[derive(Debug, Default)]
pub struct OwnershipTable {
    pub(crate) containers: HashMap<ContainerId, ItemBuckets>,
    cursors: HashMap<PlayerId, HeldCursor>,
    pub(crate) world_items: HashMap<EntityId, ClaimBuckets>,
    staged: HashMap<PlayerId, ItemBuckets>,
}

impl OwnershipTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    #[must_use]
    pub fn buckets(&self, id: ContainerId, item: &ItemType) -> Option<&ClaimBuckets> {
        self.containers.get(&id).and_then(|items| items.get(item))
    }

    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&HashMap<ItemType, ClaimBuckets>> {
        self.containers.get(&id)
    }

    pub fn container_ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.containers.keys()
    }

    #[must_use]
    pub fn tracked(&self, id: ContainerId, item: &ItemType) -> u32 {
        self.buckets(id, item).map_or(0, ClaimBuckets::total)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
            && self.cursors.is_empty()
            && self.world_items.is_empty()
            && self.staged.is_empty()
    }

    /// Records for `(id, item)`, created on demand and sorted by `order`.
    fn records_mut(&mut self, id: ContainerId, item: &ItemType, order: ClaimOrder) -> &mut ClaimBuckets {
        let records = self
            .containers
            .entry(id)
            .or_default()
            .entry(item.clone())
            .or_insert_with(|| claim_buckets(order));
        records.apply_order(order);
        records
    }

    /// Drop empty bucket maps and empty containers.
    fn prune(&mut self, id: ContainerId, item: &ItemType) {
        if let Some(items) = self.containers.get_mut(&id) {
            if items.get(item).is_some_and(ClaimBuckets::is_empty) {
                items.remove(item);
            }
            if items.is_empty() {
                self.containers.remove(&id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Reconcile every item type of `live` against its observed contents.
    pub fn track_inventory(&mut self, live: &dyn LiveContainer) {
        let id = live.id();
        let actual = live.quantities();
        let mut items: BTreeSet<ItemType> = actual.keys().cloned().collect();
        if let Some(tracked) = self.containers.get(&id) {
            items.extend(tracked.keys().cloned());
        }

        for item in items {
            let have = actual.get(&item).copied().unwrap_or(0);
            let tracked = self.tracked(id, &item);
            if have > tracked {
                let status = self.gain_default(id, &item, have - tracked, id.drop_order());
                debug!(container = %id, %item, gained = have - tracked, %status, "reconciled gain");
            } else if have < tracked {
                let removed = self.lose(id, &item, tracked - have);
                debug!(container = %id, %item, lost = removed.total(), "reconciled loss");
            }
        }
    }

    /// Reconcile a player's main container and ender storage.
    pub fn track_player(&mut self, main: &dyn LiveContainer, ender: &dyn LiveContainer) {
        self.track_inventory(main);
        self.track_inventory(ender);
    }

    /// Credit `amount` units of unknown provenance. The front bucket under
    /// `inspect` absorbs them when it is `Empty` or a fresh claim; otherwise
    /// they open a default-status bucket.
    fn gain_default(
        &mut self,
        id: ContainerId,
        item: &ItemType,
        amount: u32,
        inspect: ClaimOrder,
    ) -> ClaimStatus {
        let default = id.default_status();
        let records = self.records_mut(id, item, inspect);
        let target = match records.first() {
            Some((front, _)) if front.is_empty() || front.is_fresh() => *front,
            _ => default,
        };
        records.add(target, amount);
        target
    }

    /// Drain `amount` units in drop order. Returns the removed partition.
    fn lose(&mut self, id: ContainerId, item: &ItemType, amount: u32) -> ClaimBuckets {
        let order = id.drop_order();
        let Some(records) = self.containers.get_mut(&id).and_then(|items| items.get_mut(item))
        else {
            return claim_buckets(order);
        };
        records.apply_order(order);
        let removed = records.drain_front(amount);
        self.prune(id, item);
        removed
    }

    /// Record units entering `live`. Returns the added partition in take order.
    pub fn sync_item_get(
        &mut self,
        live: &dyn LiveContainer,
        item: &ItemType,
        gain: Gain,
    ) -> ClaimBuckets {
        let id = live.id();
        let take = id.take_order();
        let mut added = claim_buckets(take);

        match gain {
            Gain::Partition(partition) => {
                if partition.total() == 0 {
                    return added;
                }
                let records = self.records_mut(id, item, take);
                for (status, amount) in partition.iter() {
                    records.add(*status, *amount);
                    added.add(*status, *amount);
                }
            }
            Gain::Status(status) => {
                let amount = self.inferred_gain(live, item);
                if amount == 0 {
                    return added;
                }
                self.records_mut(id, item, take).add(status, amount);
                added.add(status, amount);
            }
            Gain::Amount(amount) => {
                if amount == 0 {
                    return added;
                }
                let status = self.gain_default(id, item, amount, take);
                added.add(status, amount);
            }
            Gain::Inferred => {
                let amount = self.inferred_gain(live, item);
                if amount == 0 {
                    return added;
                }
                let status = self.gain_default(id, item, amount, take);
                added.add(status, amount);
            }
        }
        debug!(container = %id, %item, added = added.total(), "item get");
        added
    }

    fn inferred_gain(&self, live: &dyn LiveContainer, item: &ItemType) -> u32 {
        live.count(item).saturating_sub(self.tracked(live.id(), item))
    }

    /// Record units leaving `live`: `min(amount, tracked)` when given,
    /// otherwise `tracked - actual`. Returns the removed partition.
    pub fn sync_item_lost(
        &mut self,
        live: &dyn LiveContainer,
        item: &ItemType,
        amount: Option<u32>,
    ) -> ClaimBuckets {
        let id = live.id();
        let tracked = self.tracked(id, item);
        let amount = match amount {
            Some(requested) => requested.min(tracked),
            None => tracked.saturating_sub(live.count(item)),
        };
        if amount == 0 {
            return claim_buckets(id.drop_order());
        }
        let removed = self.lose(id, item, amount);
        debug!(container = %id, %item, removed = removed.total(), "item lost");
        removed
    }

    /// Reconcile a move of `item` from `src` to `dst`, carrying claim status
    /// across for the units that can be matched on both sides.
    pub fn sync_item_transfer(
        &mut self,
        src: &dyn LiveContainer,
        dst: &dyn LiveContainer,
        item: &ItemType,
    ) -> TransferOutcome {
        let (src_id, dst_id) = (src.id(), dst.id());
        if src_id == dst_id {
            return TransferOutcome::SameContainer;
        }

        let tracked_src = self.tracked(src_id, item);
        let tracked_dst = self.tracked(dst_id, item);
        let (src_tracked, dst_tracked) = (tracked_src > 0, tracked_dst > 0);
        if !src_tracked && !dst_tracked {
            self.track_inventory(src);
            self.track_inventory(dst);
            return TransferOutcome::Retracked;
        }

        let lost = if src_tracked {
            tracked_src.saturating_sub(src.count(item))
        } else {
            0
        };
        let gained = if dst_tracked {
            dst.count(item).saturating_sub(tracked_dst)
        } else {
            0
        };
        let matched = match (src_tracked, dst_tracked) {
            (true, true) => lost.min(gained),
            (true, false) => lost,
            _ => gained,
        };

        let (src_player, dst_player) = player_sides(src_id, dst_id);
        let src_drop = src_player.map_or(ClaimOrder::SharedDrop, ClaimOrder::PlayerDrop);
        let dst_take = dst_player.map_or(ClaimOrder::SharedTake, ClaimOrder::PlayerTake);
        let promote_to = dst_player.filter(|_| dst_id.accrues_claims());
        let dst_default = promote_to.map_or(ClaimStatus::Empty, ClaimStatus::timered);

        let mut removed = claim_buckets(src_drop);
        if src_tracked && lost > 0 {
            removed = self.records_mut(src_id, item, src_drop).drain_front(lost);
            self.prune(src_id, item);
        }
        let moved = removed.clone().drain_front(matched);

        let mut credited = claim_buckets(dst_take);
        if matched > 0 {
            if moved.is_empty() {
                let status = self.credit_default(dst_id, item, matched, dst_take, dst_default, promote_to);
                credited.add(status, matched);
            } else {
                let records = self.records_mut(dst_id, item, dst_take);
                for (status, amount) in moved.iter() {
                    let status = promoted(*status, promote_to);
                    records.add(status, *amount);
                    credited.add(status, *amount);
                }
            }
        }
        if dst_tracked && gained > matched {
            let extra = gained - matched;
            let status = self.credit_default(dst_id, item, extra, dst_take, dst_default, promote_to);
            credited.add(status, extra);
        }

        debug!(
            src = %src_id,
            dst = %dst_id,
            %item,
            lost,
            gained,
            matched,
            "item transfer"
        );
        TransferOutcome::Moved {
            lost,
            gained,
            matched,
            removed,
            credited,
        }
    }

    fn credit_default(
        &mut self,
        id: ContainerId,
        item: &ItemType,
        amount: u32,
        take: ClaimOrder,
        default: ClaimStatus,
        promote_to: Option<PlayerId>,
    ) -> ClaimStatus {
        let records = self.records_mut(id, item, take);
        let target = match records.first() {
            Some((front, _)) if front.is_empty() || front.is_fresh() => promoted(*front, promote_to),
            _ => default,
        };
        records.add(target, amount);
        target
    }

    /// Remove every bucket matching `pred` from `live`, clearing the same
    /// number of units from its stacks. Returns units removed per item type.
    pub fn remove_items(
        &mut self,
        live: &mut dyn LiveContainer,
        pred: impl Fn(&ClaimStatus) -> bool,
    ) -> BTreeMap<ItemType, u32> {
        let id = live.id();
        let mut removed = BTreeMap::new();
        let Some(items) = self.containers.get_mut(&id) else {
            return removed;
        };

        for (item, records) in items.iter_mut() {
            let mut count = 0u32;
            records.retain(|status, amount| {
                if pred(status) {
                    count = count.saturating_add(*amount);
                    false
                } else {
                    true
                }
            });
            if count > 0 {
                let cleared = live.take(item, count);
                if cleared < count {
                    debug!(container = %id, %item, count, cleared, "live stacks held fewer units than tracked");
                }
                removed.insert(item.clone(), count);
            }
        }
        items.retain(|_, records| !records.is_empty());
        if items.is_empty() {
            self.containers.remove(&id);
        }
        removed
    }

    /// Re-key a bucket map after an item's identity changed in place.
    pub fn rekey_item(&mut self, id: ContainerId, from: &ItemType, to: &ItemType) {
        if from == to {
            return;
        }
        let Some(items) = self.containers.get_mut(&id) else {
            return;
        };
        let Some(moved) = items.remove(from) else {
            return;
        };
        match items.get_mut(to) {
            Some(existing) => existing.add_all(&moved),
            None => {
                items.insert(to.clone(), moved);
            }
        }
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Age claims in the main containers of players `is_online` accepts.
    pub fn tick_player_inventories(&mut self, seconds: u32, is_online: impl Fn(PlayerId) -> bool) {
        self.tick_where(seconds, |id| match id {
            ContainerId::Player {
                player,
                view: PlayerView::Main,
            } => is_online(*player),
            _ => false,
        });
    }

    /// Age claims in every player's ender storage.
    pub fn tick_ender_storage(&mut self, seconds: u32) {
        self.tick_where(seconds, |id| {
            matches!(
                id,
                ContainerId::Player {
                    view: PlayerView::EnderStorage,
                    ..
                }
            )
        });
    }

    /// Age claims in one container.
    pub fn tick_container(&mut self, target: ContainerId, seconds: u32) {
        self.tick_where(seconds, |id| *id == target);
    }

    fn tick_where(&mut self, seconds: u32, select: impl Fn(&ContainerId) -> bool) {
        if seconds == 0 {
            return;
        }
        for (id, items) in &mut self.containers {
            if !select(id) {
                continue;
            }
            let holder = id.player();
            for records in items.values_mut() {
                let mut rebuilt = records.empty_like();
                for (status, amount) in records.iter() {
                    let status = match holder {
                        Some(player) => status.rearm_for(player),
                        None => *status,
                    };
                    rebuilt.add(status.tick_timer(seconds), *amount);
                }
                *records = rebuilt;
            }
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    pub fn set_cursor(&mut self, player: PlayerId, item: ItemType, buckets: ClaimBuckets) {
        if buckets.is_empty() {
            self.cursors.remove(&player);
        } else {
            self.cursors.insert(player, HeldCursor { item, buckets });
        }
    }

    #[must_use]
    pub fn cursor(&self, player: PlayerId) -> Option<&HeldCursor> {
        self.cursors.get(&player)
    }

    pub fn take_cursor(&mut self, player: PlayerId) -> Option<HeldCursor> {
        self.cursors.remove(&player)
    }

    /// Split `amount` units off the held cursor, front to back under `order`.
    pub fn take_from_cursor(&mut self, player: PlayerId, amount: u32, order: ClaimOrder) -> ClaimBuckets {
        let Some(held) = self.cursors.get_mut(&player) else {
            return claim_buckets(order);
        };
        held.buckets.apply_order(order);
        let taken = held.buckets.drain_front(amount);
        if held.buckets.is_empty() {
            self.cursors.remove(&player);
        }
        taken
    }

    /// Release the whole cursor. Pending claims do not survive the drop.
    pub fn drop_cursor_all(&mut self, player: PlayerId) -> Option<HeldCursor> {
        let held = self.cursors.remove(&player)?;
        let mut stripped = held.buckets.empty_like();
        for (status, amount) in held.buckets.iter() {
            stripped.add(status.strip_timer(), *amount);
        }
        Some(HeldCursor {
            item: held.item,
            buckets: stripped,
        })
    }

    /// Release one unit, the first the player would give up.
    pub fn drop_cursor_one(&mut self, player: PlayerId) -> Option<HeldCursor> {
        let order = ClaimOrder::PlayerDrop(player);
        let held = self.cursors.get_mut(&player)?;
        let item = held.item.clone();
        held.buckets.apply_order(order);
        let one = held.buckets.drain_front(1);
        if held.buckets.is_empty() {
            self.cursors.remove(&player);
        }
        let (status, _) = one.first()?;
        Some(HeldCursor {
            item,
            buckets: ClaimBuckets::single(order, status.strip_timer(), 1),
        })
    }

    // ------------------------------------------------------------------
    // World items and staging
    // ------------------------------------------------------------------

    pub fn set_world_item(&mut self, entity: EntityId, buckets: ClaimBuckets) {
        if buckets.is_empty() {
            self.world_items.remove(&entity);
        } else {
            self.world_items.insert(entity, buckets);
        }
    }

    #[must_use]
    pub fn world_item(&self, entity: EntityId) -> Option<&ClaimBuckets> {
        self.world_items.get(&entity)
    }

    pub fn unset_world_item(&mut self, entity: EntityId) -> Option<ClaimBuckets> {
        self.world_items.remove(&entity)
    }

    /// Fold `removed`'s partition into `target` after the host merged the two
    /// item entities.
    pub fn merge_world_items(&mut self, removed: EntityId, target: EntityId) {
        if removed == target {
            return;
        }
        let Some(partition) = self.world_items.remove(&removed) else {
            return;
        };
        match self.world_items.get_mut(&target) {
            Some(existing) => existing.add_all(&partition),
            None => {
                self.world_items.insert(target, partition);
            }
        }
    }

    /// Hold a released partition until the host spawns its item entity.
    pub fn stage_dropped(&mut self, player: PlayerId, item: ItemType, mut buckets: ClaimBuckets) {
        if buckets.is_empty() {
            return;
        }
        buckets.apply_order(ClaimOrder::Neutral);
        let staged = self.staged.entry(player).or_default();
        match staged.get_mut(&item) {
            Some(existing) => existing.add_all(&buckets),
            None => {
                staged.insert(item, buckets);
            }
        }
    }

    #[must_use]
    pub fn staged(&self, player: PlayerId, item: &ItemType) -> Option<&ClaimBuckets> {
        self.staged.get(&player).and_then(|items| items.get(item))
    }

    /// Attribute up to `amount` staged units to a spawned item entity.
    /// Returns how many units were attributed.
    pub fn instantiate_staged(
        &mut self,
        player: PlayerId,
        entity: EntityId,
        item: &ItemType,
        amount: u32,
    ) -> u32 {
        let Some(items) = self.staged.get_mut(&player) else {
            return 0;
        };
        let Some(staged) = items.get_mut(item) else {
            return 0;
        };
        let mut taken = staged.drain_front(amount);
        if staged.is_empty() {
            items.remove(item);
        }
        if items.is_empty() {
            self.staged.remove(&player);
        }

        let count = taken.total();
        if count > 0 {
            taken.apply_order(ClaimOrder::SharedTake);
            self.world_items.insert(entity, taken);
        }
        count
    }
}

/// Which player, if any, each endpoint of a transfer is ordered for.
///
/// When both endpoints are player containers only one side gets player
/// ordering: the main container if exactly one is main, else the source.
fn player_sides(src: ContainerId, dst: ContainerId) -> (Option<PlayerId>, Option<PlayerId>) {
    match (src.player(), dst.player()) {
        (Some(_), Some(dst_player)) if dst.is_player_main() && !src.is_player_main() => {
            (None, Some(dst_player))
        }
        (Some(src_player), Some(_)) => (Some(src_player), None),
        sides => sides,
    }
}

fn promoted(status: ClaimStatus, promote_to: Option<PlayerId>) -> ClaimStatus {
    match promote_to {
        Some(player) if status.is_empty() => ClaimStatus::timered(player),
        _ => status,
    }
}
