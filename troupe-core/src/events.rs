use troupe_shared::models::events::DomainEvent;

/// Outbound event port. The engine emits domain events through this after
/// every significant transition; the store crate provides the broadcast-bus
/// implementation the API relays over SSE.
///
/// Emission is fire-and-forget: a sink with no listeners is not an error.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Sink that drops every event. Used where a caller genuinely does not care
/// about the event feed (unit tests, one-shot tooling).
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DomainEvent) {}
}
