//! Reconciliation of tracked claims against live container contents.

use fairkeep_core::{Gain, LiveContainer, OwnershipTable};
use fairkeep_types::{
    BlockPos, ClaimOrder, ClaimStatus, ContainerId, EntityId, Holder, PlayerId, PlayerView,
    UtilityUi, WorldId,
};

use crate::common::{assert_conserved, container, item, ordered, partition};

#[test]
fn get_and_lost_sequences_conserve_units() {
    let p = PlayerId::random();
    let stick = item("stick");
    let mut main = container(ContainerId::main(p), &[("stick", 3)]);
    let mut table = OwnershipTable::new();
    table.track_inventory(&main);
    assert_conserved(&table, &main);

    assert!(main.put(&stick, 4));
    let added = table.sync_item_get(&main, &stick, Gain::Inferred);
    assert_eq!(added.total(), 4);
    assert_conserved(&table, &main);

    assert_eq!(main.take(&stick, 5), 5);
    let removed = table.sync_item_lost(&main, &stick, None);
    assert_eq!(removed.total(), 5);
    assert_conserved(&table, &main);

    // Changes the table never heard about are absorbed by the next pass.
    assert!(main.put(&item("stone"), 9));
    main.take(&stick, 1);
    table.track_inventory(&main);
    assert_conserved(&table, &main);
    assert_eq!(table.tracked(ContainerId::main(p), &stick), 1);
}

#[test]
fn explicit_loss_never_exceeds_tracked() {
    let mut chest = container(ContainerId::Entity(EntityId::random()), &[("stick", 2)]);
    let mut table = OwnershipTable::new();
    table.track_inventory(&chest);
    chest.take(&item("stick"), 2);

    let removed = table.sync_item_lost(&chest, &item("stick"), Some(10));
    assert_eq!(removed.total(), 2);
    assert!(table.container(chest.id()).is_none());
}

#[test]
fn external_gain_on_owned_stack_opens_a_player_claim() {
    let owner = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let mut main = container(ContainerId::main(owner), &[("stick", 3)]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &main,
        &stick,
        Gain::Partition(partition(&[(ClaimStatus::owned(a), 3)])),
    );

    assert!(main.put(&stick, 2));
    table.track_inventory(&main);

    assert_eq!(
        ordered(&table, main.id(), &stick, ClaimOrder::PlayerDrop(owner)),
        vec![(ClaimStatus::timered(owner), 2), (ClaimStatus::owned(a), 3)]
    );
}

#[test]
fn loss_drains_unowned_units_before_own() {
    let p = PlayerId::random();
    let stick = item("stick");
    let mut main = container(ContainerId::main(p), &[("stick", 4)]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &main,
        &stick,
        Gain::Partition(partition(&[
            (ClaimStatus::owned(p), 2),
            (ClaimStatus::Empty, 2),
        ])),
    );

    main.take(&stick, 3);
    table.track_inventory(&main);
    assert_eq!(
        ordered(&table, main.id(), &stick, ClaimOrder::PlayerDrop(p)),
        vec![(ClaimStatus::owned(p), 1)]
    );
}

#[test]
fn fresh_claims_resolve_after_full_duration() {
    let p = PlayerId::random();
    let stick = item("stick");
    let main = container(ContainerId::main(p), &[("stick", 5)]);
    let mut table = OwnershipTable::new();
    table.track_inventory(&main);
    assert_eq!(
        ordered(&table, main.id(), &stick, ClaimOrder::Neutral),
        vec![(ClaimStatus::timered(p), 5)]
    );

    table.tick_player_inventories(600, |_| true);
    assert_eq!(
        ordered(&table, main.id(), &stick, ClaimOrder::Neutral),
        vec![(ClaimStatus::owned(p), 5)]
    );
}

#[test]
fn player_ticking_rearms_foreign_claims() {
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let main = container(ContainerId::main(p), &[("stick", 6)]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &main,
        &stick,
        Gain::Partition(partition(&[
            (ClaimStatus::owned(a), 1),
            (ClaimStatus::timered_for(a, 30), 2),
            (ClaimStatus::Empty, 3),
        ])),
    );

    table.tick_player_inventories(100, |_| true);

    let after = ordered(&table, main.id(), &stick, ClaimOrder::Neutral);
    assert_eq!(after.len(), 2);
    assert!(after.contains(&(ClaimStatus::claiming_for(a, p, 500), 1)));
    assert!(after.contains(&(ClaimStatus::timered_for(p, 500), 5)));
}

#[test]
fn tick_resolution_is_monotone() {
    let p = PlayerId::random();
    let o = PlayerId::random();
    for remaining in [1, 2, 59, 600] {
        let timered = ClaimStatus::timered_for(p, remaining);
        assert_eq!(timered.tick_timer(remaining), ClaimStatus::owned(p));
        assert_eq!(timered.tick_timer(remaining + 10), ClaimStatus::owned(p));
        assert_eq!(timered.tick_timer(0), timered);
        if remaining > 1 {
            assert_eq!(timered.tick_timer(remaining - 1), ClaimStatus::timered_for(p, 1));
        }

        let claiming = ClaimStatus::claiming_for(o, p, remaining);
        assert_eq!(claiming.tick_timer(remaining), ClaimStatus::owned(p));
    }
    assert_eq!(ClaimStatus::owned(o).tick_timer(600), ClaimStatus::owned(o));
    assert_eq!(ClaimStatus::Empty.tick_timer(600), ClaimStatus::Empty);
}

#[test]
fn drop_orders_are_exact_reverses_of_take_orders() {
    let p = PlayerId::random();
    let q = PlayerId::random();
    let statuses = [
        ClaimStatus::Empty,
        ClaimStatus::owned(p),
        ClaimStatus::owned(q),
        ClaimStatus::timered_for(p, 10),
        ClaimStatus::timered_for(p, 500),
        ClaimStatus::timered_for(q, 10),
        ClaimStatus::claiming_for(q, p, 200),
        ClaimStatus::claiming_for(p, q, 200),
    ];
    let pairs = [
        (ClaimOrder::PlayerDrop(p), ClaimOrder::PlayerTake(p)),
        (ClaimOrder::SharedDrop, ClaimOrder::SharedTake),
    ];
    for (drop, take) in pairs {
        assert_eq!(drop.reversed(), take);
        for a in &statuses {
            for b in &statuses {
                assert_eq!(drop.compare(a, b), take.compare(b, a), "{a} vs {b} under {drop:?}");
            }
        }
    }
}

#[test]
fn reapplying_an_order_changes_nothing() {
    let p = PlayerId::random();
    let q = PlayerId::random();
    let mut buckets = partition(&[
        (ClaimStatus::owned(q), 1),
        (ClaimStatus::timered_for(p, 10), 2),
        (ClaimStatus::Empty, 3),
        (ClaimStatus::owned(p), 4),
        (ClaimStatus::timered_for(q, 90), 5),
        (ClaimStatus::timered_for(p, 300), 6),
    ]);
    for order in [
        ClaimOrder::PlayerDrop(p),
        ClaimOrder::PlayerTake(q),
        ClaimOrder::SharedDrop,
        ClaimOrder::SharedTake,
    ] {
        buckets.apply_order(order);
        let once = buckets.entries().to_vec();
        buckets.apply_order(order);
        assert_eq!(buckets.entries(), once.as_slice());
        assert_eq!(buckets.total(), 21);
    }
}

#[test]
fn full_cursor_drop_strips_timers_onto_world_item() {
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let mut table = OwnershipTable::new();
    table.set_cursor(
        p,
        stick.clone(),
        partition(&[(ClaimStatus::owned(a), 2), (ClaimStatus::Empty, 1)]),
    );

    let released = table.drop_cursor_all(p).expect("held cursor");
    assert_eq!(released.item, stick);
    let entity = EntityId::random();
    table.set_world_item(entity, released.buckets);

    let world = table.world_item(entity).expect("world item");
    assert_eq!(world.get(&ClaimStatus::owned(a)), Some(&2));
    assert_eq!(world.get(&ClaimStatus::Empty), Some(&1));
    assert!(table.cursor(p).is_none());
}

#[test]
fn death_style_removal_spans_item_types() {
    let p = PlayerId::random();
    let a = PlayerId::random();
    let mut main = container(ContainerId::main(p), &[("stick", 3), ("stone", 2)]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &main,
        &item("stick"),
        Gain::Partition(partition(&[(ClaimStatus::owned(p), 1), (ClaimStatus::owned(a), 2)])),
    );
    table.track_inventory(&main);

    let removed = table.remove_items(&mut main, |status| !status.is_owned_by(p));
    assert_eq!(removed.get(&item("stick")), Some(&2));
    assert_eq!(removed.get(&item("stone")), Some(&2));
    assert_eq!(main.count(&item("stick")), 1);
    assert_eq!(main.count(&item("stone")), 0);
    assert_conserved(&table, &main);
}

#[test]
fn double_chest_halves_share_one_record() {
    let world = WorldId::random();
    let left = BlockPos::new(world, 0, 64, 0);
    let right = BlockPos::new(world, 1, 64, 0);
    let from_left = ContainerId::resolve(&Holder::DoubleChest { left, right });
    let from_block = ContainerId::resolve(&Holder::Block(left));
    assert_eq!(from_left, from_block);

    let mut table = OwnershipTable::new();
    table.track_inventory(&container(from_left, &[("stick", 4)]));
    assert_eq!(table.tracked(from_block, &item("stick")), 4);
    assert_eq!(
        ordered(&table, from_block, &item("stick"), ClaimOrder::Neutral),
        vec![(ClaimStatus::Empty, 4)]
    );
}

#[test]
fn utility_ui_tracks_under_its_viewer() {
    let p = PlayerId::random();
    let id = ContainerId::resolve(&Holder::Unheld {
        kind: Some(UtilityUi::Anvil),
        first_viewer: Some(p),
    });
    assert_eq!(id.player(), Some(p));
    assert_eq!(id.view(), Some(PlayerView::Anvil));
    assert_eq!(id.default_status(), ClaimStatus::Empty);

    let nobody = ContainerId::resolve(&Holder::Unheld {
        kind: Some(UtilityUi::Beacon),
        first_viewer: None,
    });
    assert_eq!(nobody, ContainerId::Virtual);
}
