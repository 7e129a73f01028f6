use eventsource::aggregate::{Aggregate, Snapshotting};
use eventsource::entity::Entity;
use eventsource::error::{DomainError, DomainResult};
use eventsource::persist::{
    AggregateRepository, EventStore, InMemoryEventStore, InMemorySnapshotStore, SnapshotStore,
    SnapshottingRepository,
};
use eventsource_macros::{domain_event, entity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InventoryItemCreated {
    name: String,
    quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InventoryItemAdjusted {
    delta: i64,
}

#[domain_event]
enum InventoryEvent {
    #[event(constructing, name = "InventoryItemCreated")]
    Created(InventoryItemCreated),
    #[event(name = "InventoryItemAdjusted")]
    Adjusted(InventoryItemAdjusted),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ItemState {
    name: String,
    quantity: i64,
}

#[entity(event = InventoryEvent)]
struct InventoryItem {
    state: ItemState,
}

#[derive(Debug)]
enum InventoryCommand {
    Create { name: String, quantity: i64 },
    Adjust { delta: i64 },
}

impl InventoryItem {
    fn handle(&mut self, command: InventoryCommand) -> DomainResult<()> {
        match command {
            InventoryCommand::Create { name, quantity } => {
                self.apply(InventoryItemCreated { name, quantity })
            }
            InventoryCommand::Adjust { delta } => {
                if self.state.quantity + delta < 0 {
                    return Err(DomainError::Validation {
                        reason: format!("not enough '{}' in stock", self.state.name),
                    });
                }
                self.apply(InventoryItemAdjusted { delta })
            }
        }
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
        2
    }

    fn current_state(&self) -> Self::State {
        self.state.clone()
    }

    fn apply_state(&mut self, state: Self::State) {
        self.state = state;
    }
}

/// 最小的命令分发：创建命令构造新聚合，其余命令先加载再执行，最后保存
async fn dispatch<R>(repo: &R, id: &str, command: InventoryCommand) -> DomainResult<InventoryItem>
where
    R: AggregateRepository<InventoryItem>,
{
    let mut item = match command {
        InventoryCommand::Create { .. } => InventoryItem::new(id.to_string()),
        _ => repo.load(id).await?,
    };
    item.handle(command)?;
    repo.save(&mut item).await?;
    Ok(item)
}

async fn run<S>(events: Arc<S>) -> anyhow::Result<()>
where
    S: EventStore + 'static,
{
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let repo = SnapshottingRepository::<InventoryItem, _, _>::with_json(
        events,
        Arc::clone(&snapshots),
        "InventoryItemState",
    )?;

    let id = format!("item-{}", ulid::Ulid::new());
    let commands = [
        InventoryCommand::Create {
            name: "xyz".into(),
            quantity: 1,
        },
        InventoryCommand::Adjust { delta: 3 },
        InventoryCommand::Adjust { delta: 2 },
        InventoryCommand::Adjust { delta: 2 },
    ];

    for command in commands {
        let item = dispatch(&repo, &id, command).await?;
        info!(
            version = item.version(),
            quantity = item.state.quantity,
            snapshots = snapshots.count(&id),
            "command handled"
        );
    }

    // 超出库存的调整被拒绝，不产生事件
    if let Err(err) = dispatch(&repo, &id, InventoryCommand::Adjust { delta: -100 }).await {
        info!(error = %err, "command rejected");
    }

    let latest = snapshots.get(&id, None).await?;
    let loaded = repo.load(&id).await?;
    println!(
        "reloaded: id={}, name={}, quantity={}, version={}, latest snapshot at version {}",
        loaded.id(),
        loaded.state.name,
        loaded.state.quantity,
        loaded.version(),
        latest.version
    );

    Ok(())
}

#[cfg(feature = "postgres")]
async fn run_with_configured_store() -> anyhow::Result<()> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url).await?;
            let store = eventsource::persist::PgEventStore::builder()
                .pool(pool)
                .build();
            store.create_table().await?;
            info!(table = store.table(), "using postgres event store");
            run(Arc::new(store)).await
        }
        Err(_) => run(Arc::new(InMemoryEventStore::new())).await,
    }
}

#[cfg(not(feature = "postgres"))]
async fn run_with_configured_store() -> anyhow::Result<()> {
    run(Arc::new(InMemoryEventStore::new())).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run_with_configured_store().await
}
