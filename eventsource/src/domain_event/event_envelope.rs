use super::domain_event_trait::{DomainEvent, EventKind};
use super::metadata::Metadata;

/// 事件信封，包含事件载荷与元数据
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<E> {
    pub metadata: Metadata,
    pub payload: E,
}

impl<E> EventEnvelope<E>
where
    E: DomainEvent,
{
    pub fn new(metadata: Metadata, payload: E) -> Self {
        Self { metadata, payload }
    }

    pub fn aggregate_id(&self) -> &str {
        self.metadata.aggregate_id()
    }

    pub fn version(&self) -> usize {
        self.metadata.version()
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}
