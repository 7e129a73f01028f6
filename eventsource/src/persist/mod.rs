//! 持久化与事件溯源（persist）
//!
//! 定义事件存储、快照存储及其通用组合实现，支持：
//! - 事件记录/快照记录的线上形态（`EventRecord`/`SnapshotRecord`）；
//! - 基于类型注册表的编解码（`JsonEventMarshaler`/`JsonSnapshotMarshaler`）；
//! - 事件追加与按聚合查询（`EventStore`），快照读写与策略（`SnapshotStore`/`SnapshotPolicy`）；
//! - 纯事件或事件+快照的聚合仓储实现（`EventSourcedRepository`、`SnapshottingRepository`）。
//!
//! 内置内存实现用于测试；Postgres 事件存储在 `postgres` feature 下提供。
//!
mod aggregate_repository;
mod event_repository;
mod inmemory;
mod marshaler;
#[cfg(feature = "postgres")]
mod postgres;
mod serialized_event;
mod serialized_snapshot;
mod snapshot_repository;

pub use aggregate_repository::{AggregateRepository, EventSourcedRepository, SnapshottingRepository};
pub use event_repository::EventStore;
pub use inmemory::{InMemoryEventStore, InMemorySnapshotStore};
pub use marshaler::{EventMarshaler, JsonEventMarshaler, JsonSnapshotMarshaler, SnapshotMarshaler};
#[cfg(feature = "postgres")]
pub use postgres::PgEventStore;
pub use serialized_event::{EventRecord, Payload};
pub use serialized_snapshot::{Snapshot, SnapshotRecord};
pub use snapshot_repository::{SnapshotPolicy, SnapshotStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_policy_should_snapshot() {
        assert!(!SnapshotPolicy::Never.should_snapshot(1));
        for v in 1..=9 {
            let should = SnapshotPolicy::Every(3).should_snapshot(v);
            assert_eq!(should, v % 3 == 0);
        }
    }

    #[test]
    fn zero_interval_disables_snapshots() {
        assert_eq!(SnapshotPolicy::from_interval(0), SnapshotPolicy::Never);
        assert_eq!(SnapshotPolicy::from_interval(2), SnapshotPolicy::Every(2));
        assert!(!SnapshotPolicy::Every(0).should_snapshot(4));
        assert!(!SnapshotPolicy::Every(2).should_snapshot(0));
    }
}
