//! 聚合仓储组合实现
//!
//! 基于事件存储（EventStore）与快照存储（SnapshotStore）的通用聚合仓储：
//! - 保存：编码未提交事件，以保存前的最后版本为基准原子追加，成功后提交缓冲，再按策略落快照；
//! - 加载：优先从最新快照恢复并只重放其后的事件尾部，没有快照时完整重放历史。
//!
//! 重建是全有或全无的：任意一条事件解码或应用失败，整个加载失败。
//!
use crate::{
    aggregate::{Aggregate, Snapshotting},
    domain_event::EventEnvelope,
    error::{DomainError, DomainResult},
    persist::{
        EventMarshaler, EventRecord, EventStore, JsonEventMarshaler, JsonSnapshotMarshaler,
        SnapshotMarshaler, SnapshotStore,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: Aggregate,
{
    /// 持久化聚合的未提交事件；成功后缓冲被清空
    async fn save(&self, aggregate: &mut A) -> DomainResult<()>;

    /// 按标识重建聚合；没有任何已存储事件时返回 `AggregateNotFound`
    async fn load(&self, aggregate_id: &str) -> DomainResult<A>;
}

#[async_trait]
impl<A, T> AggregateRepository<A> for Arc<T>
where
    A: Aggregate,
    T: AggregateRepository<A> + ?Sized,
{
    async fn save(&self, aggregate: &mut A) -> DomainResult<()> {
        (**self).save(aggregate).await
    }

    async fn load(&self, aggregate_id: &str) -> DomainResult<A> {
        (**self).load(aggregate_id).await
    }
}

fn require_id(aggregate_id: &str) -> DomainResult<()> {
    if aggregate_id.is_empty() {
        return Err(DomainError::Validation {
            reason: "aggregate id must not be empty".to_string(),
        });
    }
    Ok(())
}

/// 仅基于事件存储的聚合仓储，每次加载都完整重放历史
pub struct EventSourcedRepository<A, S>
where
    A: Aggregate,
{
    store: Arc<S>,
    marshaler: Arc<dyn EventMarshaler<A::Event>>,
}

impl<A, S> Clone for EventSourcedRepository<A, S>
where
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            marshaler: Arc::clone(&self.marshaler),
        }
    }
}

impl<A, S> EventSourcedRepository<A, S>
where
    A: Aggregate,
    S: EventStore,
{
    pub fn new(store: Arc<S>, marshaler: Arc<dyn EventMarshaler<A::Event>>) -> Self {
        Self { store, marshaler }
    }

    /// 使用 JSON 编解码器，并以事件集合的静态注册表完成一次性绑定
    pub fn with_json(store: Arc<S>) -> DomainResult<Self> {
        let marshaler = JsonEventMarshaler::<A::Event>::bound()?;
        Ok(Self::new(store, Arc::new(marshaler)))
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 原子追加未提交事件并提交缓冲，返回写入的记录数
    async fn append_uncommitted(&self, aggregate: &mut A) -> DomainResult<usize> {
        require_id(aggregate.id())?;

        let pending = aggregate.uncommitted_events();
        if pending.is_empty() {
            return Ok(0);
        }

        let records = pending
            .iter()
            .map(|envelope| self.marshaler.marshal(envelope))
            .collect::<DomainResult<Vec<EventRecord>>>()?;

        let base_version = aggregate.root().base_version();
        debug!(count = records.len(), ?base_version, "appending events");

        let stored = match self
            .store
            .append(aggregate.id(), records, base_version)
            .await
        {
            Ok(stored) => stored,
            Err(err @ DomainError::VersionConflict { .. }) => {
                warn!(error = %err, "stream head moved since the aggregate was loaded");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        aggregate.commit_events();
        Ok(stored.len())
    }

    /// 读取 `since_version` 之后的记录并解码为事件信封
    async fn history(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
    ) -> DomainResult<Vec<EventEnvelope<A::Event>>> {
        self.store
            .load_from(aggregate_id, since_version)
            .await?
            .iter()
            .map(|record| self.marshaler.unmarshal(aggregate_id, record))
            .collect()
    }
}

#[async_trait]
impl<A, S> AggregateRepository<A> for EventSourcedRepository<A, S>
where
    A: Aggregate,
    S: EventStore,
{
    #[tracing::instrument(skip_all, fields(aggregate_id = %aggregate.id(), aggregate_type = A::TYPE), err)]
    async fn save(&self, aggregate: &mut A) -> DomainResult<()> {
        self.append_uncommitted(aggregate).await.map(|_| ())
    }

    #[tracing::instrument(skip_all, fields(aggregate_id = %aggregate_id, aggregate_type = A::TYPE), err)]
    async fn load(&self, aggregate_id: &str) -> DomainResult<A> {
        require_id(aggregate_id)?;

        let history = self.history(aggregate_id, None).await?;
        if history.is_empty() {
            return Err(DomainError::AggregateNotFound {
                aggregate_id: aggregate_id.to_string(),
            });
        }

        debug!(events = history.len(), "replaying full history");
        let mut aggregate = A::new(aggregate_id.to_string());
        aggregate.load_from_history(history)?;
        Ok(aggregate)
    }
}

/// 事件存储 + 快照存储的聚合仓储
/// - 保存：追加事件后，若流长度命中快照间隔则写入一份快照
/// - 加载：优先恢复最新快照，然后只重放快照版本之后的事件
pub struct SnapshottingRepository<A, S, N>
where
    A: Snapshotting,
{
    events: EventSourcedRepository<A, S>,
    snapshots: Arc<N>,
    marshaler: Arc<dyn SnapshotMarshaler<A::State>>,
}

impl<A, S, N> SnapshottingRepository<A, S, N>
where
    A: Snapshotting,
    S: EventStore,
    N: SnapshotStore,
{
    pub fn new(
        events: EventSourcedRepository<A, S>,
        snapshots: Arc<N>,
        marshaler: Arc<dyn SnapshotMarshaler<A::State>>,
    ) -> Self {
        Self {
            events,
            snapshots,
            marshaler,
        }
    }

    /// 事件与快照均使用 JSON 编解码器；状态类型以 `state_name` 绑定
    pub fn with_json(
        event_store: Arc<S>,
        snapshot_store: Arc<N>,
        state_name: &'static str,
    ) -> DomainResult<Self> {
        let events = EventSourcedRepository::with_json(event_store)?;
        let marshaler = JsonSnapshotMarshaler::<A::State>::bound(state_name)?;
        Ok(Self::new(events, snapshot_store, Arc::new(marshaler)))
    }

    pub fn snapshot_store(&self) -> &Arc<N> {
        &self.snapshots
    }

    async fn take_snapshot(&self, aggregate: &A) -> DomainResult<()> {
        let record = self.marshaler.marshal(&aggregate.snapshot())?;
        debug!(version = record.version, "writing snapshot");
        self.snapshots.put(record).await
    }

    /// 事件流必须仍然覆盖到快照版本
    async fn ensure_stream_reaches(&self, aggregate_id: &str, version: usize) -> DomainResult<()> {
        match self.events.store().last_version(aggregate_id).await? {
            None => {
                warn!(snapshot_version = version, "snapshot left behind by a removed stream");
                Err(DomainError::AggregateNotFound {
                    aggregate_id: aggregate_id.to_string(),
                })
            }
            Some(head) if head < version => Err(DomainError::InvalidState {
                reason: format!(
                    "snapshot of '{aggregate_id}' at version {version} is ahead of the stream head {head}"
                ),
            }),
            Some(_) => Ok(()),
        }
    }

    async fn restore_latest(&self, aggregate_id: &str) -> DomainResult<Option<A>> {
        let record = match self.snapshots.get(aggregate_id, None).await {
            Ok(record) => record,
            Err(DomainError::SnapshotNotFound { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };

        let snapshot = self.marshaler.unmarshal(&record)?;
        let since = snapshot.version;

        let mut aggregate = A::new(aggregate_id.to_string());
        aggregate.restore(snapshot)?;

        let tail = self.events.history(aggregate_id, Some(since)).await?;
        if tail.is_empty() {
            self.ensure_stream_reaches(aggregate_id, since).await?;
        }

        debug!(snapshot_version = since, events = tail.len(), "replaying tail after snapshot");
        aggregate.load_from_history(tail)?;

        Ok(Some(aggregate))
    }
}

#[async_trait]
impl<A, S, N> AggregateRepository<A> for SnapshottingRepository<A, S, N>
where
    A: Snapshotting,
    S: EventStore,
    N: SnapshotStore,
{
    #[tracing::instrument(skip_all, fields(aggregate_id = %aggregate.id(), aggregate_type = A::TYPE), err)]
    async fn save(&self, aggregate: &mut A) -> DomainResult<()> {
        let appended = self.events.append_uncommitted(aggregate).await?;
        if appended == 0 {
            return Ok(());
        }

        // 事件已提交；快照失败时原样返回，已写入的事件不受影响
        if aggregate
            .snapshot_policy()
            .should_snapshot(aggregate.stream_size())
        {
            self.take_snapshot(aggregate).await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(aggregate_id = %aggregate_id, aggregate_type = A::TYPE), err)]
    async fn load(&self, aggregate_id: &str) -> DomainResult<A> {
        require_id(aggregate_id)?;

        if let Some(aggregate) = self.restore_latest(aggregate_id).await? {
            return Ok(aggregate);
        }

        debug!("no snapshot available, falling back to full replay");
        <EventSourcedRepository<A, S> as AggregateRepository<A>>::load(&self.events, aggregate_id)
            .await
    }
}
