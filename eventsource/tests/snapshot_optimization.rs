mod common;

use anyhow::Result as AnyResult;
use common::{CountingEventStore, InventoryItem, SNAPSHOT_INTERVAL, unique_id};
use eventsource::entity::Entity;
use eventsource::persist::{
    AggregateRepository, EventSourcedRepository, InMemorySnapshotStore, SnapshottingRepository,
};
use std::sync::Arc;

#[tokio::test]
async fn snapshot_optimization_by_call_count() -> AnyResult<()> {
    let events = Arc::new(CountingEventStore::default());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let repo = SnapshottingRepository::<InventoryItem, _, _>::with_json(
        Arc::clone(&events),
        Arc::clone(&snapshots),
        "InventoryItemState",
    )?;
    let id = unique_id("c");

    // 写入大量历史事件，每次保存一条
    let mut item = InventoryItem::create(&id, "counter", 0)?;
    repo.save(&mut item).await?;
    for _ in 1..=100 {
        item.adjust(1)?;
        repo.save(&mut item).await?;
    }
    assert_eq!(item.stream_size(), 101);
    assert_eq!(snapshots.count(&id), 101 / SNAPSHOT_INTERVAL);

    events.reset();
    let loaded = repo.load(&id).await?;
    assert_eq!(loaded.version(), 100);
    assert_eq!(loaded.state.quantity, 100);

    // 最新快照在版本 99（流长度 100），只需读取一次尾部
    assert_eq!(events.loads(), vec![Some(99)]);
    Ok(())
}

#[tokio::test]
async fn plain_repository_always_replays_from_the_beginning() -> AnyResult<()> {
    let events = Arc::new(CountingEventStore::default());
    let repo = EventSourcedRepository::<InventoryItem, _>::with_json(Arc::clone(&events))?;
    let id = unique_id("c");

    let mut item = InventoryItem::create(&id, "counter", 0)?;
    for _ in 0..5 {
        item.adjust(2)?;
    }
    repo.save(&mut item).await?;

    events.reset();
    let loaded = repo.load(&id).await?;
    assert_eq!(loaded.state.quantity, 10);
    assert_eq!(loaded.version(), 5);
    assert_eq!(events.loads(), vec![None]);
    Ok(())
}
