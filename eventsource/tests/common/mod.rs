#![allow(dead_code)]

use async_trait::async_trait;
use eventsource::aggregate::{Aggregate, Snapshotting};
use eventsource::error::{DomainError, DomainResult};
use eventsource::persist::{EventRecord, EventStore, InMemoryEventStore};
use eventsource_macros::{domain_event, entity};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SNAPSHOT_INTERVAL: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemCreated {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemAdjusted {
    pub delta: i64,
}

#[domain_event]
pub enum InventoryEvent {
    #[event(constructing, name = "InventoryItemCreated")]
    Created(InventoryItemCreated),
    #[event(name = "InventoryItemAdjusted")]
    Adjusted(InventoryItemAdjusted),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
    pub name: String,
    pub quantity: i64,
}

#[entity(event = InventoryEvent)]
pub struct InventoryItem {
    pub state: ItemState,
}

impl InventoryItem {
    pub fn create(id: &str, name: &str, quantity: i64) -> DomainResult<Self> {
        let mut item = <Self as eventsource::entity::Entity>::new(id.to_string());
        item.apply(InventoryItemCreated {
            name: name.to_string(),
            quantity,
        })?;
        Ok(item)
    }

    pub fn adjust(&mut self, delta: i64) -> DomainResult<()> {
        if self.state.quantity + delta < 0 {
            return Err(DomainError::Validation {
                reason: format!("quantity of '{}' cannot drop below zero", self.state.name),
            });
        }
        self.apply(InventoryItemAdjusted { delta })
    }
}

impl Aggregate for InventoryItem {
    const TYPE: &'static str = "inventory_item";

    fn on(&mut self, event: &Self::Event) -> DomainResult<()> {
        match event {
            InventoryEvent::Created(e) => {
                self.state = ItemState {
                    name: e.name.clone(),
                    quantity: e.quantity,
                };
            }
            InventoryEvent::Adjusted(e) => self.state.quantity += e.delta,
        }
        Ok(())
    }
}

impl Snapshotting for InventoryItem {
    type State = ItemState;

    fn snapshot_interval(&self) -> usize {
        SNAPSHOT_INTERVAL
    }

    fn current_state(&self) -> Self::State {
        self.state.clone()
    }

    fn apply_state(&mut self, state: Self::State) {
        self.state = state;
    }
}

/// 记录每次 `load_from` 的起点，用于验证快照加速路径只读取尾部
#[derive(Debug, Default)]
pub struct CountingEventStore {
    pub inner: InMemoryEventStore,
    pub appends: AtomicUsize,
    pub loads: Mutex<Vec<Option<usize>>>,
}

impl CountingEventStore {
    pub fn loads(&self) -> Vec<Option<usize>> {
        self.loads.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.loads.lock().unwrap().clear();
        self.appends.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for CountingEventStore {
    async fn append(
        &self,
        aggregate_id: &str,
        records: Vec<EventRecord>,
        base_version: Option<usize>,
    ) -> DomainResult<Vec<EventRecord>> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append(aggregate_id, records, base_version).await
    }

    async fn load_from(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
    ) -> DomainResult<Vec<EventRecord>> {
        self.loads.lock().unwrap().push(since_version);
        self.inner.load_from(aggregate_id, since_version).await
    }

    async fn last_version(&self, aggregate_id: &str) -> DomainResult<Option<usize>> {
        self.inner.last_version(aggregate_id).await
    }
}

pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", ulid::Ulid::new())
}
