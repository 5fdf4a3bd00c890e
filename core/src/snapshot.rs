//! Full-state snapshots of the persistent part of the table.

use std::collections::HashMap;

use fairkeep_types::{ClaimBuckets, ContainerId, EntityId, ItemType, ParseError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::table::OwnershipTable;

/// One `(container, item type)` bucket map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub container_id: String,
    pub item_type: String,
    pub ownership: String,
}

/// One world item entity's bucket map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldItemRecord {
    pub entity_id: String,
    pub ownership: String,
}

/// Encoded container and world-item state. Cursor and staging state is
/// transient and not part of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub containers: Vec<ContainerRecord>,
    pub world_items: Vec<WorldItemRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.world_items.is_empty()
    }
}

impl OwnershipTable {
    /// Encode containers and world items. Records are sorted; each bucket map
    /// keeps its current order.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut containers: Vec<ContainerRecord> = self
            .containers
            .iter()
            .flat_map(|(id, items)| {
                items.iter().map(move |(item, buckets)| ContainerRecord {
                    container_id: id.to_string(),
                    item_type: item.to_string(),
                    ownership: buckets.encode(),
                })
            })
            .collect();
        containers.sort_by(|a, b| {
            (&a.container_id, &a.item_type).cmp(&(&b.container_id, &b.item_type))
        });

        let mut world_items: Vec<WorldItemRecord> = self
            .world_items
            .iter()
            .map(|(entity, buckets)| WorldItemRecord {
                entity_id: entity.to_string(),
                ownership: buckets.encode(),
            })
            .collect();
        world_items.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        Snapshot {
            containers,
            world_items,
        }
    }

    /// Replace container and world-item state with `snapshot`.
    ///
    /// Decoding finishes before anything is replaced, so a malformed record
    /// leaves the table as it was.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), ParseError> {
        let mut containers: HashMap<ContainerId, HashMap<ItemType, ClaimBuckets>> = HashMap::new();
        for record in &snapshot.containers {
            let id: ContainerId = record.container_id.parse()?;
            let item: ItemType = record.item_type.parse()?;
            let buckets = ClaimBuckets::decode(&record.ownership)?;
            if buckets.is_empty() {
                continue;
            }
            let items = containers.entry(id).or_default();
            match items.get_mut(&item) {
                Some(existing) => existing.add_all(&buckets),
                None => {
                    items.insert(item, buckets);
                }
            }
        }

        let mut world_items: HashMap<EntityId, ClaimBuckets> = HashMap::new();
        for record in &snapshot.world_items {
            let entity: EntityId = record.entity_id.parse()?;
            let buckets = ClaimBuckets::decode(&record.ownership)?;
            if !buckets.is_empty() {
                world_items.insert(entity, buckets);
            }
        }

        info!(
            containers = containers.len(),
            world_items = world_items.len(),
            "restored ownership snapshot"
        );
        self.containers = containers;
        self.world_items = world_items;
        Ok(())
    }
}
