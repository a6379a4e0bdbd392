use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct InterestReceivedEvent {
    pub interest_id: Uuid,
    pub destination_id: Uuid,
    pub num_people: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct GroupFormedEvent {
    pub group_id: Uuid,
    pub destination_id: Uuid,
    pub member_count: usize,
    pub seat_count: i32,
    pub final_price_per_person: f64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MemberRespondedEvent {
    pub group_id: Uuid,
    pub confirmation_id: Uuid,
    pub confirmed: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct GroupStatusChangedEvent {
    pub group_id: Uuid,
    pub from: String,
    pub to: String,
    pub current_size: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentRecordedEvent {
    pub group_id: Uuid,
    pub confirmation_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ConfirmationsDispatchedEvent {
    pub group_id: Uuid,
    pub pending_members: usize,
    pub timestamp: i64,
}

/// Envelope published on the in-process event bus and relayed over SSE.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    InterestReceived(InterestReceivedEvent),
    GroupFormed(GroupFormedEvent),
    MemberResponded(MemberRespondedEvent),
    GroupStatusChanged(GroupStatusChangedEvent),
    PaymentRecorded(PaymentRecordedEvent),
    ConfirmationsDispatched(ConfirmationsDispatchedEvent),
}

impl DomainEvent {
    /// Group the event concerns, used for per-group SSE filtering.
    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::InterestReceived(_) => None,
            DomainEvent::GroupFormed(e) => Some(e.group_id),
            DomainEvent::MemberResponded(e) => Some(e.group_id),
            DomainEvent::GroupStatusChanged(e) => Some(e.group_id),
            DomainEvent::PaymentRecorded(e) => Some(e.group_id),
            DomainEvent::ConfirmationsDispatched(e) => Some(e.group_id),
        }
    }
}
