use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is driving a workflow call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    /// A traveler acting through a public endpoint (identified by the
    /// contact email they registered the interest with).
    Traveler { email: String },
    /// An operator acting through the admin surface.
    Operator { operator_id: String },
    /// Time-driven transitions (deadline sweeps) and payment callbacks.
    System,
}

/// Request-scoped context passed explicitly into every workflow call.
///
/// There is no ambient session state anywhere in the engine; handlers build
/// one of these per request and thread it down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub actor: Actor,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor,
            received_at: chrono::Utc::now(),
        }
    }

    pub fn system() -> Self {
        Self::new(Actor::System)
    }

    pub fn traveler(email: impl Into<String>) -> Self {
        Self::new(Actor::Traveler { email: email.into() })
    }

    pub fn operator(operator_id: impl Into<String>) -> Self {
        Self::new(Actor::Operator {
            operator_id: operator_id.into(),
        })
    }
}
