//! 内存实现的事件存储与快照存储
//!
//! 适用于测试与本地开发。基于 `DashMap`：同一聚合的写入由条目锁串行化，
//! 不同聚合之间互不阻塞。实例需显式创建并注入仓储，`clear`/`remove` 用于显式清理。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    persist::{EventRecord, EventStore, SnapshotRecord, SnapshotStore},
};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: DashMap<String, Vec<EventRecord>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定聚合已存储的事件数
    pub fn stream_len(&self, aggregate_id: &str) -> usize {
        self.streams
            .get(aggregate_id)
            .map(|stream| stream.len())
            .unwrap_or_default()
    }

    pub fn remove(&self, aggregate_id: &str) {
        self.streams.remove(aggregate_id);
    }

    pub fn clear(&self) {
        self.streams.clear();
    }
}

fn assign_versions(records: Vec<EventRecord>, base_version: Option<usize>) -> Vec<EventRecord> {
    let first = base_version.map_or(0, |v| v + 1);
    records
        .into_iter()
        .enumerate()
        .map(|(offset, record)| EventRecord {
            version: first + offset,
            ..record
        })
        .collect()
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        records: Vec<EventRecord>,
        base_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        if records.is_empty() {
            return Ok(records);
        }

        let conflict = |actual: Option<usize>| DomainError::VersionConflict {
            aggregate_id: aggregate_id.to_string(),
            expected: base_version,
            actual,
        };

        let records = assign_versions(records, base_version);

        match self.streams.entry(aggregate_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let head = entry.get().last().map(|r| r.version);
                if head != base_version {
                    return Err(conflict(head));
                }
                entry.get_mut().extend(records.iter().cloned());
            }
            Entry::Vacant(entry) => {
                if base_version.is_some() {
                    return Err(conflict(None));
                }
                entry.insert(records.clone());
            }
        }

        Ok(records)
    }

    async fn load_from(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        let Some(stream) = self.streams.get(aggregate_id) else {
            return Ok(Vec::new());
        };

        Ok(stream
            .iter()
            .filter(|r| since_version.is_none_or(|since| r.version > since))
            .cloned()
            .collect())
    }

    async fn last_version(&self, aggregate_id: &str) -> Result<Option<usize>> {
        Ok(self
            .streams
            .get(aggregate_id)
            .and_then(|stream| stream.last().map(|r| r.version)))
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: DashMap<String, Vec<SnapshotRecord>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定聚合保存的快照数
    pub fn count(&self, aggregate_id: &str) -> usize {
        self.snapshots
            .get(aggregate_id)
            .map(|snaps| snaps.len())
            .unwrap_or_default()
    }

    pub fn remove(&self, aggregate_id: &str) {
        self.snapshots.remove(aggregate_id);
    }

    pub fn clear(&self) {
        self.snapshots.clear();
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn put(&self, record: SnapshotRecord) -> Result<()> {
        let mut snaps = self
            .snapshots
            .entry(record.aggregate_id.clone())
            .or_default();

        // 按版本有序；同版本的快照被替换
        match snaps.binary_search_by_key(&record.version, |s| s.version) {
            Ok(idx) => snaps[idx] = record,
            Err(idx) => snaps.insert(idx, record),
        }

        Ok(())
    }

    async fn get(
        &self,
        aggregate_id: &str,
        version_ceiling: Option<usize>,
    ) -> Result<SnapshotRecord> {
        self.snapshots
            .get(aggregate_id)
            .and_then(|snaps| {
                snaps
                    .iter()
                    .rev()
                    .find(|s| version_ceiling.is_none_or(|ceiling| s.version <= ceiling))
                    .cloned()
            })
            .ok_or_else(|| DomainError::SnapshotNotFound {
                aggregate_id: aggregate_id.to_string(),
            })
    }
}
