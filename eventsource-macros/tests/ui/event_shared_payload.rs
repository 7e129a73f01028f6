use eventsource::domain_event::DomainEvent;
use eventsource_macros::domain_event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Amount {
    cents: i64,
}

// 同一负载类型出现在多个变体时不生成 From，需要显式构造变体
#[domain_event]
enum WalletEvent {
    #[event(constructing)]
    Opened(Amount),
    Deposited(Amount),
    Withdrawn(Amount),
}

fn main() {
    let event = WalletEvent::Deposited(Amount { cents: 250 });
    assert_eq!(event.event_type(), "Deposited");

    let names: Vec<&str> = WalletEvent::bindings().iter().map(|b| b.name()).collect();
    assert_eq!(names, ["Opened", "Deposited", "Withdrawn"]);
}
