//! Status-preserving moves between two tracked containers.

use fairkeep_core::{Gain, LiveContainer, OwnershipTable, TransferOutcome};
use fairkeep_types::{ClaimOrder, ClaimStatus, ContainerId, EntityId, PlayerId};

use crate::common::{assert_conserved, container, item, ordered, partition};

#[test]
fn chest_to_untracked_main_carries_statuses_and_promotes_unowned() {
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let mut chest = container(ContainerId::Entity(EntityId::random()), &[("stick", 5)]);
    let mut main = container(ContainerId::main(p), &[]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &chest,
        &stick,
        Gain::Partition(partition(&[(ClaimStatus::owned(a), 2), (ClaimStatus::Empty, 3)])),
    );

    chest.take(&stick, 4);
    assert!(main.put(&stick, 4));
    let outcome = table.sync_item_transfer(&chest, &main, &stick);

    let TransferOutcome::Moved { lost, matched, .. } = &outcome else {
        panic!("expected a move, got {outcome:?}");
    };
    assert_eq!((*lost, *matched), (4, 4));
    assert_eq!(
        ordered(&table, chest.id(), &stick, ClaimOrder::Neutral),
        vec![(ClaimStatus::owned(a), 1)]
    );
    let into_main = ordered(&table, main.id(), &stick, ClaimOrder::PlayerDrop(p));
    assert_eq!(
        into_main,
        vec![(ClaimStatus::timered(p), 3), (ClaimStatus::owned(a), 1)]
    );
    assert_conserved(&table, &chest);
    assert_conserved(&table, &main);
}

#[test]
fn unmatched_destination_surplus_is_credited_as_default() {
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let mut chest = container(ContainerId::Entity(EntityId::random()), &[("stick", 5)]);
    let mut main = container(ContainerId::main(p), &[("stick", 1)]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &chest,
        &stick,
        Gain::Partition(partition(&[(ClaimStatus::owned(a), 5)])),
    );
    table.sync_item_get(
        &main,
        &stick,
        Gain::Partition(partition(&[(ClaimStatus::owned(p), 1)])),
    );

    // Three leave the chest; five show up in the main container.
    chest.take(&stick, 3);
    assert!(main.put(&stick, 5));
    let outcome = table.sync_item_transfer(&chest, &main, &stick);

    let TransferOutcome::Moved {
        lost,
        gained,
        matched,
        removed,
        credited,
    } = &outcome
    else {
        panic!("expected a move, got {outcome:?}");
    };
    assert_eq!((*lost, *gained, *matched), (3, 5, 3));
    assert_eq!(removed.total(), 3);
    assert_eq!(credited.total(), 5);
    assert_eq!(credited.get(&ClaimStatus::owned(a)), Some(&3));
    assert_eq!(credited.get(&ClaimStatus::timered(p)), Some(&2));
    assert_conserved(&table, &chest);
    assert_conserved(&table, &main);
}

#[test]
fn destination_only_tracking_credits_the_observed_gain() {
    let p = PlayerId::random();
    let stick = item("stick");
    let chest = container(ContainerId::Entity(EntityId::random()), &[]);
    let mut main = container(ContainerId::main(p), &[("stick", 2)]);
    let mut table = OwnershipTable::new();
    table.track_inventory(&main);

    assert!(main.put(&stick, 3));
    let outcome = table.sync_item_transfer(&chest, &main, &stick);
    let TransferOutcome::Moved { matched, .. } = &outcome else {
        panic!("expected a move, got {outcome:?}");
    };
    assert_eq!(*matched, 3);
    // The fresh claim at the front absorbs the new units.
    assert_eq!(
        ordered(&table, main.id(), &stick, ClaimOrder::Neutral),
        vec![(ClaimStatus::timered(p), 5)]
    );
}

#[test]
fn untracked_endpoints_are_reconciled_from_scratch() {
    let p = PlayerId::random();
    let stick = item("stick");
    let chest = container(ContainerId::Entity(EntityId::random()), &[("stick", 1)]);
    let main = container(ContainerId::main(p), &[("stick", 2)]);
    let mut table = OwnershipTable::new();

    assert_eq!(
        table.sync_item_transfer(&chest, &main, &stick),
        TransferOutcome::Retracked
    );
    assert_eq!(
        ordered(&table, chest.id(), &stick, ClaimOrder::Neutral),
        vec![(ClaimStatus::Empty, 1)]
    );
    assert_eq!(
        ordered(&table, main.id(), &stick, ClaimOrder::Neutral),
        vec![(ClaimStatus::timered(p), 2)]
    );
}

#[test]
fn moving_within_one_container_is_a_no_op() {
    let p = PlayerId::random();
    let main = container(ContainerId::main(p), &[("stick", 2)]);
    let mut table = OwnershipTable::new();
    table.track_inventory(&main);
    let before = table.snapshot();

    assert_eq!(
        table.sync_item_transfer(&main, &main, &item("stick")),
        TransferOutcome::SameContainer
    );
    assert_eq!(table.snapshot(), before);
}

#[test]
fn main_to_ender_keeps_claims_without_promotion_on_source_side() {
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let mut main = container(ContainerId::main(p), &[("stick", 3)]);
    let mut ender = container(ContainerId::ender(p), &[("stick", 1)]);
    let mut table = OwnershipTable::new();
    table.sync_item_get(
        &main,
        &stick,
        Gain::Partition(partition(&[(ClaimStatus::owned(a), 1), (ClaimStatus::Empty, 2)])),
    );
    table.sync_item_get(
        &ender,
        &stick,
        Gain::Partition(partition(&[(ClaimStatus::owned(p), 1)])),
    );

    main.take(&stick, 2);
    assert!(ender.put(&stick, 2));
    let outcome = table.sync_item_transfer(&main, &ender, &stick);
    let TransferOutcome::Moved { removed, .. } = &outcome else {
        panic!("expected a move, got {outcome:?}");
    };

    // Main is the player side: it gives up unowned units first and the ender
    // side receives them as they were.
    assert_eq!(removed.get(&ClaimStatus::Empty), Some(&2));
    assert_eq!(ender.count(&stick), 3);
    assert_eq!(
        ordered(&table, ender.id(), &stick, ClaimOrder::Neutral).len(),
        2
    );
    assert_conserved(&table, &main);
    assert_conserved(&table, &ender);
}
