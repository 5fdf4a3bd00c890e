//! End-to-end drop provenance through the engine.

use fairkeep_core::LiveContainer;
use fairkeep_engine::{DropRequest, Engine};
use fairkeep_store::SnapshotStore;
use fairkeep_types::settings::{EngineSettings, HandoffSettings, TickSettings};
use fairkeep_types::{ClaimStatus, ContainerId, EntityId, ItemType, PlayerId};
use tokio::runtime::Handle;

use crate::common::{container, item, partition};

fn engine(timeout_ms: u64) -> Engine {
    let settings = EngineSettings {
        ticking: TickSettings::default(),
        handoff: HandoffSettings::new(timeout_ms, 2, 1000).expect("handoff settings"),
    };
    Engine::new(settings, Handle::current())
}

fn request(player: PlayerId, item: ItemType, amount: u32) -> DropRequest {
    DropRequest {
        player,
        entity: EntityId::random(),
        item,
        amount,
    }
}

#[tokio::test]
async fn one_unit_cursor_drop_releases_the_least_valued_unit() {
    let mut engine = engine(200);
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    engine.table_mut().set_cursor(
        p,
        stick.clone(),
        partition(&[(ClaimStatus::owned(p), 2), (ClaimStatus::owned(a), 1)]),
    );

    let drop = request(p, stick.clone(), 1);
    let entity = drop.entity;
    let waiter = engine.begin_drop(drop).expect("waiter");
    let released = engine.drop_cursor(p, false).expect("released unit");
    waiter.await.expect("join");
    engine.on_tick(|_| true);

    assert_eq!(released.buckets.get(&ClaimStatus::owned(a)), Some(&1));
    let world = engine.table().world_item(entity).expect("world item");
    assert_eq!(world.get(&ClaimStatus::owned(a)), Some(&1));
    let held = engine.table().cursor(p).expect("cursor keeps the rest");
    assert_eq!(held.buckets.get(&ClaimStatus::owned(p)), Some(&2));
}

#[tokio::test]
async fn unanswered_drop_falls_back_to_staging() {
    let mut engine = engine(10);
    let p = PlayerId::random();
    let stick = item("stick");
    engine.table_mut().stage_dropped(
        p,
        stick.clone(),
        partition(&[(ClaimStatus::owned(p), 2)]),
    );

    let drop = request(p, stick.clone(), 2);
    let entity = drop.entity;
    let waiter = engine.begin_drop(drop).expect("waiter");
    waiter.await.expect("join");

    for _ in 0..3 {
        engine.on_tick(|_| true);
    }
    let world = engine.table().world_item(entity).expect("world item");
    assert_eq!(world.get(&ClaimStatus::owned(p)), Some(&2));
    assert!(engine.table().staged(p, &stick).is_none());
}

#[tokio::test]
async fn overlapping_drops_do_not_share_a_publication() {
    let mut engine = engine(30);
    let p = PlayerId::random();
    let a = PlayerId::random();
    let stick = item("stick");
    let mut main = container(ContainerId::main(p), &[("stick", 3)]);
    engine.table_mut().track_inventory(&main);

    let first = request(p, stick.clone(), 1);
    let second = request(p, stick.clone(), 1);
    let (first_entity, second_entity) = (first.entity, second.entity);
    let waiter = engine.begin_drop(first).expect("first waiter");
    assert!(engine.begin_drop(second).is_none());

    main.take(&stick, 1);
    engine.drop_from_slot(&main, p, &stick, None);
    waiter.await.expect("join");
    engine.publish_drop(p, stick.clone(), partition(&[(ClaimStatus::owned(a), 1)]));
    for _ in 0..3 {
        engine.on_tick(|_| true);
    }

    let first_world = engine.table().world_item(first_entity).expect("first entity");
    assert_eq!(first_world.get(&ClaimStatus::timered(p)), Some(&1));
    let second_world = engine.table().world_item(second_entity).expect("second entity");
    assert_eq!(second_world.get(&ClaimStatus::owned(a)), Some(&1));
    assert_eq!(engine.table().tracked(main.id(), &stick), 2);

    // A later drop with no publication of its own gets nothing.
    let third = request(p, stick.clone(), 1);
    let third_entity = third.entity;
    engine.begin_drop(third).expect("third waiter").await.expect("join");
    for _ in 0..3 {
        engine.on_tick(|_| true);
    }
    assert!(engine.table().world_item(third_entity).is_none());
    assert!(engine.table().staged(p, &stick).is_none());
}

#[tokio::test]
async fn engine_state_persists_across_restarts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fairkeep.db");
    let p = PlayerId::random();
    let ender = container(ContainerId::ender(p), &[("pearl", 8)]);

    let mut engine = engine(100);
    engine.table_mut().track_inventory(&ender);
    {
        let mut store = SnapshotStore::open(&path).expect("open store");
        engine.persist(&mut store).expect("persist");
    }

    let store = SnapshotStore::open(&path).expect("reopen store");
    let mut restarted = self::engine(100);
    restarted.load(&store).expect("load");
    assert_eq!(restarted.table().tracked(ender.id(), &item("pearl")), 8);
    assert_eq!(restarted.table().snapshot(), engine.table().snapshot());
}
