//! Shared test utilities and fixtures

#![allow(dead_code)]

use fairkeep_core::{LiveContainer, OwnershipTable, SlotContainer, Stack};
use fairkeep_types::{ClaimBuckets, ClaimOrder, ClaimStatus, ContainerId, ItemType, claim_buckets};

pub fn item(name: &str) -> ItemType {
    ItemType::new(format!("minecraft:{name}")).expect("item type")
}

/// A container holding one stack per `(name, amount)` pair.
pub fn container(id: ContainerId, stacks: &[(&str, u32)]) -> SlotContainer {
    let mut live = SlotContainer::new(id, 27);
    for (slot, (name, amount)) in stacks.iter().enumerate() {
        live.set(slot, Some(Stack::new(item(name), *amount)));
    }
    live
}

pub fn partition(entries: &[(ClaimStatus, u32)]) -> ClaimBuckets {
    let mut buckets = claim_buckets(ClaimOrder::Neutral);
    for (status, amount) in entries {
        buckets.add(*status, *amount);
    }
    buckets
}

/// Statuses and amounts of `(id, item)` in `order`.
pub fn ordered(
    table: &OwnershipTable,
    id: ContainerId,
    item: &ItemType,
    order: ClaimOrder,
) -> Vec<(ClaimStatus, u32)> {
    let Some(buckets) = table.buckets(id, item) else {
        return Vec::new();
    };
    let mut buckets = buckets.clone();
    buckets.apply_order(order);
    buckets.iter().map(|(status, amount)| (*status, *amount)).collect()
}

/// Tracked units equal live units for every item type `live` holds.
pub fn assert_conserved(table: &OwnershipTable, live: &dyn LiveContainer) {
    for (item, amount) in live.quantities() {
        assert_eq!(
            table.tracked(live.id(), &item),
            amount,
            "tracked units of {item} in {} drifted from live contents",
            live.id()
        );
    }
}
