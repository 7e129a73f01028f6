//! 编解码器（Marshaler）
//!
//! 在内存中的事件/快照状态与持久化记录之间转换。默认实现基于 JSON 与 `TypeRegistry`：
//! 编码与解码都要求类型名事先绑定，未绑定的类型名一律视为序列化错误。
//!
use crate::{
    domain_event::{DomainEvent, EventEnvelope, Metadata},
    error::{DomainError, DomainResult},
    persist::{EventRecord, Payload, Snapshot, SnapshotRecord},
    registry::{TypeBinding, TypeRegistry},
};
use serde::Serialize;
use std::any::TypeId;

pub trait EventMarshaler<E>: Send + Sync {
    fn marshal(&self, event: &EventEnvelope<E>) -> DomainResult<EventRecord>;

    /// 记录不携带聚合标识，由调用方提供
    fn unmarshal(&self, aggregate_id: &str, record: &EventRecord) -> DomainResult<EventEnvelope<E>>;
}

pub trait SnapshotMarshaler<S>: Send + Sync {
    fn marshal(&self, snapshot: &Snapshot<S>) -> DomainResult<SnapshotRecord>;

    fn unmarshal(&self, record: &SnapshotRecord) -> DomainResult<Snapshot<S>>;
}

#[derive(Debug)]
pub struct JsonEventMarshaler<E> {
    registry: TypeRegistry<E>,
}

impl<E> Default for JsonEventMarshaler<E> {
    fn default() -> Self {
        Self {
            registry: TypeRegistry::new(),
        }
    }
}

impl<E> JsonEventMarshaler<E>
where
    E: DomainEvent,
{
    /// 未绑定任何类型的编解码器
    pub fn new() -> Self {
        Self::default()
    }

    /// 以事件集合的静态注册表完成绑定
    pub fn bound() -> DomainResult<Self> {
        let mut marshaler = Self::new();
        marshaler.bind(E::bindings())?;
        Ok(marshaler)
    }

    pub fn bind<I>(&mut self, bindings: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = TypeBinding<E>>,
    {
        self.registry.bind(bindings)
    }

    pub fn registry(&self) -> &TypeRegistry<E> {
        &self.registry
    }
}

impl<E> EventMarshaler<E> for JsonEventMarshaler<E>
where
    E: DomainEvent,
{
    fn marshal(&self, event: &EventEnvelope<E>) -> DomainResult<EventRecord> {
        let type_name = event.payload.event_type();
        if !self.registry.is_bound(type_name) {
            return Err(DomainError::UnregisteredType {
                type_name: type_name.to_string(),
            });
        }

        Ok(EventRecord {
            version: event.version(),
            timestamp: event.metadata.occurred_at(),
            payload: Payload::new(type_name, event.payload.encode()?),
        })
    }

    fn unmarshal(&self, aggregate_id: &str, record: &EventRecord) -> DomainResult<EventEnvelope<E>> {
        let payload = self
            .registry
            .decode(&record.payload.type_name, record.payload.data.clone())?;

        let metadata = Metadata::builder()
            .aggregate_id(aggregate_id)
            .version(record.version)
            .occurred_at(record.timestamp)
            .build();

        Ok(EventEnvelope::new(metadata, payload))
    }
}

#[derive(Debug)]
pub struct JsonSnapshotMarshaler<S> {
    registry: TypeRegistry<S>,
}

impl<S> Default for JsonSnapshotMarshaler<S> {
    fn default() -> Self {
        Self {
            registry: TypeRegistry::new(),
        }
    }
}

impl<S> JsonSnapshotMarshaler<S>
where
    S: Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定名字绑定状态类型自身
    pub fn bound(name: &'static str) -> DomainResult<Self> {
        let mut marshaler = Self::new();
        marshaler.bind([TypeBinding::of(name)])?;
        Ok(marshaler)
    }

    pub fn bind<I>(&mut self, bindings: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = TypeBinding<S>>,
    {
        self.registry.bind(bindings)
    }
}

impl<S> SnapshotMarshaler<S> for JsonSnapshotMarshaler<S>
where
    S: Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    fn marshal(&self, snapshot: &Snapshot<S>) -> DomainResult<SnapshotRecord> {
        let type_name = self.registry.name_of(TypeId::of::<S>()).ok_or_else(|| {
            DomainError::UnregisteredType {
                type_name: std::any::type_name::<S>().to_string(),
            }
        })?;

        Ok(SnapshotRecord {
            aggregate_id: snapshot.aggregate_id.clone(),
            version: snapshot.version,
            payload: Payload::new(type_name, serde_json::to_value(&snapshot.state)?),
        })
    }

    fn unmarshal(&self, record: &SnapshotRecord) -> DomainResult<Snapshot<S>> {
        let state = self
            .registry
            .decode(&record.payload.type_name, record.payload.data.clone())?;

        Ok(Snapshot {
            aggregate_id: record.aggregate_id.clone(),
            version: record.version,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::EpochMillis;
    use crate::error::ErrorKind;
    use eventsource_macros::domain_event;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct InventoryItemCreated {
        name: String,
        quantity: i64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct InventoryItemAdjusted {
        quantity: i64,
    }

    #[domain_event]
    enum InventoryEvent {
        #[event(constructing, name = "InventoryItemCreated")]
        Created(InventoryItemCreated),
        #[event(name = "InventoryItemAdjusted")]
        Adjusted(InventoryItemAdjusted),
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ItemState {
        name: String,
        quantity: i64,
    }

    fn adjusted(version: usize, quantity: i64) -> EventEnvelope<InventoryEvent> {
        EventEnvelope::new(
            Metadata::builder()
                .aggregate_id("abc123")
                .version(version)
                .occurred_at(EpochMillis::from_millis(42))
                .build(),
            InventoryItemAdjusted { quantity }.into(),
        )
    }

    #[test]
    fn event_marshal_unmarshal_preserves_envelope() {
        let marshaler = JsonEventMarshaler::<InventoryEvent>::bound().unwrap();
        let envelope = adjusted(3, 2);

        let record = marshaler.marshal(&envelope).unwrap();
        assert_eq!(record.version, 3);
        assert_eq!(record.timestamp, EpochMillis::from_millis(42));
        assert_eq!(record.payload.type_name, "InventoryItemAdjusted");
        assert_eq!(record.payload.data, serde_json::json!({ "quantity": 2 }));

        let restored = marshaler.unmarshal("abc123", &record).unwrap();
        assert_eq!(restored, envelope);
    }

    #[test]
    fn unbound_marshaler_rejects_both_directions() {
        let marshaler = JsonEventMarshaler::<InventoryEvent>::new();
        let err = marshaler.marshal(&adjusted(1, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let record = EventRecord {
            version: 1,
            timestamp: EpochMillis::from_millis(0),
            payload: Payload::new("InventoryItemAdjusted", serde_json::json!({ "quantity": 1 })),
        };
        let err = marshaler.unmarshal("abc123", &record).unwrap_err();
        assert!(matches!(err, DomainError::UnregisteredType { .. }));
    }

    #[test]
    fn malformed_data_is_serialization_error() {
        let marshaler = JsonEventMarshaler::<InventoryEvent>::bound().unwrap();
        let record = EventRecord {
            version: 1,
            timestamp: EpochMillis::from_millis(0),
            payload: Payload::new("InventoryItemAdjusted", serde_json::json!({ "qty": "x" })),
        };
        let err = marshaler.unmarshal("abc123", &record).unwrap_err();
        assert!(matches!(err, DomainError::Serde { .. }));
    }

    #[test]
    fn snapshot_marshal_requires_bound_state() {
        let snapshot = Snapshot {
            aggregate_id: "abc123".to_string(),
            version: 3,
            state: ItemState {
                name: "xyz".into(),
                quantity: 8,
            },
        };

        let unbound = JsonSnapshotMarshaler::<ItemState>::new();
        let err = unbound.marshal(&snapshot).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let marshaler = JsonSnapshotMarshaler::<ItemState>::bound("ItemState").unwrap();
        let record = marshaler.marshal(&snapshot).unwrap();
        assert_eq!(record.payload.type_name, "ItemState");
        assert_eq!(
            serde_json::to_value(&record).unwrap()["aggregateId"],
            serde_json::json!("abc123")
        );

        assert_eq!(marshaler.unmarshal(&record).unwrap(), snapshot);
    }
}
