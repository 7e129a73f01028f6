//! 领域事件（Domain Event）
//!
//! 定义聚合事件集合需要实现的最小接口（`DomainEvent`）、事件分类（`EventKind`），
//! 以及将事件与元数据封装后的 `EventEnvelope`。

mod domain_event_trait;
mod event_envelope;
mod metadata;

pub use domain_event_trait::{DomainEvent, EventKind};
pub use event_envelope::EventEnvelope;
pub use metadata::Metadata;
