//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合的核心行为：
//! - `on` 将单个事件投影到状态（穷尽匹配事件变体，拒绝时返回错误）；
//! - `apply`/`apply_change` 在状态迁移成功后更新计数与未提交缓冲；
//! - `load_from_history` 按顺序重放历史并重新计算版本；
//! - 支持快照的聚合额外实现 `Snapshotting`。
//!
use crate::aggregate_root::Origin;
use crate::domain_event::EventEnvelope;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::persist::{Snapshot, SnapshotPolicy};
use serde::{Serialize, de::DeserializeOwned};

/// 聚合根接口
pub trait Aggregate: Entity {
    const TYPE: &'static str;

    /// 状态迁移：对事件集合做穷尽匹配，返回错误时整个 apply 被中止
    fn on(&mut self, event: &Self::Event) -> DomainResult<()>;

    /// 应用一条新产生的事件
    fn apply<T>(&mut self, event: T) -> DomainResult<()>
    where
        T: Into<Self::Event>,
    {
        let envelope = self.root().stamp(event.into());
        self.apply_change(envelope, Origin::New)
    }

    fn apply_change(
        &mut self,
        envelope: EventEnvelope<Self::Event>,
        origin: Origin,
    ) -> DomainResult<()> {
        self.root().check(&envelope, origin)?;
        self.on(&envelope.payload)?;
        self.root_mut().record(envelope, origin);
        Ok(())
    }

    /// 按顺序重放完整且不重叠的事件尾部，随后以累计流长度重新计算版本
    fn load_from_history(&mut self, history: Vec<EventEnvelope<Self::Event>>) -> DomainResult<()> {
        if !self.root().uncommitted_events().is_empty() {
            return Err(DomainError::InvalidState {
                reason: format!(
                    "aggregate '{}' has uncommitted events, refusing to replay history",
                    self.id()
                ),
            });
        }

        for envelope in history {
            self.apply_change(envelope, Origin::Replayed)?;
        }

        self.root_mut().recompute_version();
        Ok(())
    }

    fn uncommitted_events(&self) -> &[EventEnvelope<Self::Event>] {
        self.root().uncommitted_events()
    }

    fn commit_events(&mut self) {
        self.root_mut().commit_events();
    }
}

/// 支持快照的聚合
pub trait Snapshotting: Aggregate {
    /// 可完整重建聚合的状态
    type State: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// 快照间隔，按流长度计；0 表示关闭快照
    fn snapshot_interval(&self) -> usize;

    fn current_state(&self) -> Self::State;

    fn apply_state(&mut self, state: Self::State);

    fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy::from_interval(self.snapshot_interval())
    }

    fn snapshot(&self) -> Snapshot<Self::State> {
        Snapshot {
            aggregate_id: self.id().to_string(),
            version: self.version(),
            state: self.current_state(),
        }
    }

    /// 以快照作为种子，之后只需重放快照版本之后的事件
    fn restore(&mut self, snapshot: Snapshot<Self::State>) -> DomainResult<()> {
        self.root_mut().restore(snapshot.version)?;
        self.apply_state(snapshot.state);
        Ok(())
    }
}
