use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use troupe_core::repository::StoreResult;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

/// One day of the published trip plan. A closed structure: the itinerary is
/// typed end to end, never an open JSON map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: u32,
    pub title: String,
    pub description: String,
    pub activities: Vec<String>,
    pub accommodation: Option<String>,
    pub meals: Vec<Meal>,
}

/// Group-discount parameters configured per destination.
///
/// `discount_per_member` accrues per traveler beyond the first and is capped
/// at `max_discount`. Both are fractions of the base price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiscountPolicy {
    pub max_discount: f64,
    pub discount_per_member: f64,
}

/// A destination travelers can register interest in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    /// Per-person price before any group discount.
    pub base_price: f64,
    /// Traveler-count bounds a formed group must respect.
    pub min_group_size: i32,
    pub max_group_size: i32,
    pub discount: DiscountPolicy,
    pub itinerary: Vec<ItineraryDay>,
    pub is_active: bool,
}

/// Read access to the destination catalog. Destination CRUD itself lives in
/// an external admin surface; the engine only reads.
#[async_trait]
pub trait DestinationRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Destination>>;

    async fn list_active(&self) -> StoreResult<Vec<Destination>>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Destination not found: {0}")]
    NotFound(Uuid),

    #[error("Destination is not accepting interests: {0}")]
    Inactive(Uuid),
}
