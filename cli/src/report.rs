//! JSON views over a stored snapshot.

use anyhow::{Context, Result};
use fairkeep_core::{OwnershipSummary, OwnershipTable, Snapshot, summarize_buckets};
use fairkeep_types::{ClaimBuckets, ContainerId, PlayerId};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ContainerRow {
    pub container_id: String,
    pub item_type: String,
    pub ownership: String,
    pub units: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<OwnershipSummary>,
}

#[derive(Debug, Serialize)]
pub struct WorldItemRow {
    pub entity_id: String,
    pub ownership: String,
    pub units: u32,
}

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub containers: Vec<ContainerRow>,
    pub world_items: Vec<WorldItemRow>,
}

/// Rows for `snapshot`, optionally narrowed to one container and summarized
/// for one player. World items are omitted when filtering by container.
pub fn inspect(
    snapshot: &Snapshot,
    container: Option<ContainerId>,
    player: Option<PlayerId>,
) -> Result<Inspection> {
    let mut containers = Vec::new();
    for record in &snapshot.containers {
        if let Some(wanted) = container {
            let id: ContainerId = record
                .container_id
                .parse()
                .with_context(|| format!("Bad container id {:?}", record.container_id))?;
            if id != wanted {
                continue;
            }
        }
        let buckets = decode(&record.ownership)?;
        containers.push(ContainerRow {
            container_id: record.container_id.clone(),
            item_type: record.item_type.clone(),
            ownership: record.ownership.clone(),
            units: buckets.total(),
            summary: player.map(|player| summarize_buckets(&buckets, player)),
        });
    }

    let mut world_items = Vec::new();
    if container.is_none() {
        for record in &snapshot.world_items {
            world_items.push(WorldItemRow {
                entity_id: record.entity_id.clone(),
                ownership: record.ownership.clone(),
                units: decode(&record.ownership)?.total(),
            });
        }
    }

    Ok(Inspection {
        containers,
        world_items,
    })
}

fn decode(ownership: &str) -> Result<ClaimBuckets> {
    ClaimBuckets::decode(ownership).with_context(|| format!("Bad ownership record {ownership:?}"))
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub containers: usize,
    pub records: usize,
    pub world_items: usize,
    pub tracked_units: u64,
}

/// Restore `snapshot` into a scratch table, failing on the first malformed
/// record.
pub fn check(snapshot: &Snapshot) -> Result<CheckReport> {
    let mut table = OwnershipTable::new();
    table
        .restore(snapshot)
        .context("Snapshot contains a malformed record")?;

    let mut report = CheckReport::default();
    for id in table.container_ids() {
        report.containers += 1;
        if let Some(items) = table.container(*id) {
            report.records += items.len();
            report.tracked_units += items.values().map(|b| u64::from(b.total())).sum::<u64>();
        }
    }
    report.world_items = snapshot.world_items.len();
    Ok(report)
}
