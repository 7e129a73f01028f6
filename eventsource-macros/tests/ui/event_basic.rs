use eventsource::domain_event::{DomainEvent, EventKind};
use eventsource_macros::domain_event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AccountOpened {
    owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AccountRenamed {
    to: String,
}

#[domain_event]
#[derive(Clone)]
enum AccountEvent {
    #[event(constructing, name = "bank.opened")]
    Opened(AccountOpened),
    /// 改名
    #[event(name = "bank.renamed")]
    Renamed(AccountRenamed),
}

fn main() {
    let event = AccountEvent::from(AccountOpened {
        owner: "alice".into(),
    });
    assert_eq!(event.event_type(), "bank.opened");
    assert_eq!(event.kind(), EventKind::Constructing);

    let renamed: AccountEvent = AccountRenamed { to: "bob".into() }.into();
    assert_eq!(renamed.kind(), EventKind::Regular);

    let bindings = AccountEvent::bindings();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[1].name(), "bank.renamed");
}
