use tokio::sync::broadcast;
use troupe_core::events::EventSink;
use troupe_shared::models::events::DomainEvent;

/// In-process fan-out of domain events. The engine publishes here after every
/// significant transition; the API relays a subscription over SSE so
/// collaborators (trending caches, dashboards) follow along without polling.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: DomainEvent) {
        // No subscribers is fine; emission is fire-and-forget.
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(receivers, "domain event published");
            }
            Err(_) => {
                tracing::trace!("domain event dropped, no subscribers");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use troupe_shared::models::events::{GroupStatusChangedEvent, DomainEvent};
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(DomainEvent::GroupStatusChanged(GroupStatusChangedEvent {
            group_id: Uuid::new_v4(),
            from: "FORMING".into(),
            to: "CONFIRMED".into(),
            current_size: 4,
            timestamp: 0,
        }));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DomainEvent::GroupStatusChanged(_)));
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let bus = EventBus::new(16);
        bus.emit(DomainEvent::GroupStatusChanged(GroupStatusChangedEvent {
            group_id: Uuid::new_v4(),
            from: "FORMING".into(),
            to: "CANCELLED".into(),
            current_size: 0,
            timestamp: 0,
        }));
    }
}
