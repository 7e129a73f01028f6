//! 实体（Entity）基础抽象
//!
//! 为聚合提供统一的标识与生命周期状态访问，通常由 `#[entity(event = ..)]` 生成。
//!
use crate::aggregate_root::AggregateRoot;
use crate::domain_event::DomainEvent;

pub trait Entity: Send + Sync + Sized {
    /// 该实体产生的领域事件集合
    type Event: DomainEvent;

    /// 使用给定标识创建全新的实例（尚未应用任何事件）
    fn new(aggregate_id: String) -> Self;

    fn root(&self) -> &AggregateRoot<Self::Event>;

    fn root_mut(&mut self) -> &mut AggregateRoot<Self::Event>;

    fn id(&self) -> &str {
        self.root().id()
    }

    fn version(&self) -> usize {
        self.root().version()
    }

    fn stream_size(&self) -> usize {
        self.root().stream_size()
    }
}
