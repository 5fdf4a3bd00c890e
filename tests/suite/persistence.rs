//! Snapshots through the SQLite store and the config file.

use std::fs;

use fairkeep_config::FairkeepConfig;
use fairkeep_core::{Gain, LiveContainer, OwnershipTable};
use fairkeep_store::SnapshotStore;
use fairkeep_types::{ClaimBuckets, ClaimOrder, ClaimStatus, ContainerId, EntityId, PlayerId};
use tempfile::tempdir;

use crate::common::{container, item, ordered, partition};

#[test]
fn table_survives_a_store_round_trip_on_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("state").join("fairkeep.db");
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");

    let mut table = OwnershipTable::new();
    let main = container(ContainerId::main(p), &[("stick", 4), ("stone", 1)]);
    table.sync_item_get(
        &main,
        &stick,
        Gain::Partition(partition(&[
            (ClaimStatus::owned(a), 1),
            (ClaimStatus::claiming_for(a, p, 77), 1),
            (ClaimStatus::timered_for(p, 5), 2),
        ])),
    );
    table.track_inventory(&main);
    let entity = EntityId::random();
    table.set_world_item(
        entity,
        ClaimBuckets::single(ClaimOrder::SharedTake, ClaimStatus::Empty, 3),
    );

    {
        let mut store = SnapshotStore::open(&path).expect("open store");
        store.save(&table.snapshot()).expect("save");
    }

    let store = SnapshotStore::open(&path).expect("reopen store");
    let mut restored = OwnershipTable::new();
    restored.restore(&store.load().expect("load")).expect("restore");

    assert_eq!(restored.snapshot(), table.snapshot());
    let statuses = ordered(&restored, main.id(), &stick, ClaimOrder::Neutral);
    assert_eq!(statuses.len(), 3);
    assert!(statuses.contains(&(ClaimStatus::claiming_for(a, p, 77), 1)));
    assert_eq!(restored.tracked(main.id(), &item("stone")), 1);
    assert_eq!(restored.world_item(entity).map(ClaimBuckets::total), Some(3));
}

#[test]
fn encoded_records_use_the_documented_wire_forms() {
    let p = PlayerId::random();
    let main = container(ContainerId::main(p), &[("stick", 2)]);
    let mut table = OwnershipTable::new();
    table.track_inventory(&main);

    let snapshot = table.snapshot();
    let [record] = snapshot.containers.as_slice() else {
        panic!("expected one record, got {:?}", snapshot.containers);
    };
    assert_eq!(record.container_id, format!("PLAYER|PLAYER|{p}"));
    assert_eq!(record.item_type, "minecraft:stick");
    assert_eq!(record.ownership, format!("T|{p}|600=2"));
}

#[test]
fn config_file_drives_engine_settings() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[ticking]
interval_ticks = 5

[storage]
path = "/var/lib/fairkeep/state.db"
"#,
    )
    .expect("write config");

    let config = FairkeepConfig::load_from(&path)
        .expect("load config")
        .expect("config present");
    assert_eq!(config.settings.ticking.interval_ticks(), 5);
    assert_eq!(config.settings.ticking.player_seconds(), 1);
    assert_eq!(
        config.storage_path.as_deref().and_then(|p| p.to_str()),
        Some("/var/lib/fairkeep/state.db")
    );
}
