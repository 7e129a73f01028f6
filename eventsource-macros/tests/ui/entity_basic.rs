use eventsource::entity::Entity;
use eventsource_macros::{domain_event, entity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TicketOpened {
    title: String,
}

#[domain_event]
enum TicketEvent {
    #[event(constructing)]
    Opened(TicketOpened),
}

#[entity(event = TicketEvent)]
struct Ticket {
    title: String,
}

#[entity(event = TicketEvent, debug = false)]
#[derive(Default)]
struct QuietTicket {
    title: String,
}

impl std::fmt::Debug for QuietTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QuietTicket")
    }
}

fn main() {
    let ticket = Ticket::new("t-1".to_string());
    assert_eq!(ticket.id(), "t-1");
    assert_eq!(ticket.version(), 0);
    assert_eq!(ticket.stream_size(), 0);
    assert!(ticket.title.is_empty());

    let quiet = QuietTicket::new("t-2".to_string());
    assert_eq!(format!("{quiet:?}"), "QuietTicket");
    assert_eq!(quiet.id(), "t-2");
}
