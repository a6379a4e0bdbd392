use async_trait::async_trait;
use uuid::Uuid;

use crate::interest::{Interest, InterestStatus};

/// Storage-layer failures. `VersionConflict` and `ClaimConflict` are the
/// concurrency signals: the workflow retries the former under its per-group
/// lock, the clusterer treats the latter as "someone else got there first"
/// and skips the candidate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict on {0}")]
    VersionConflict(String),

    #[error("interest claim lost: {0}")]
    ClaimConflict(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Interest persistence. No business logic beyond status mutation; every
/// transition method enforces the `group_id` iff MATCHED/CONVERTED invariant.
#[async_trait]
pub trait InterestRepository: Send + Sync {
    /// Insert a new interest, or return the already-stored one when the
    /// `client_uuid` was seen before. The bool is true when a row was created.
    async fn create(&self, interest: Interest) -> StoreResult<(Interest, bool)>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Interest>>;

    async fn list(
        &self,
        destination_id: Option<Uuid>,
        status: Option<InterestStatus>,
    ) -> StoreResult<Vec<Interest>>;

    /// Open interests for one destination, oldest first (the clustering
    /// order the tie-break policy depends on).
    async fn open_for_destination(&self, destination_id: Uuid) -> StoreResult<Vec<Interest>>;

    /// Destinations that currently have at least one open interest.
    async fn destinations_with_open(&self) -> StoreResult<Vec<Uuid>>;

    /// Atomically transition every listed interest OPEN -> MATCHED with the
    /// given group id. All-or-nothing: if any of them is no longer open the
    /// whole claim fails with `ClaimConflict` and nothing is modified.
    async fn claim_for_group(&self, ids: &[Uuid], group_id: Uuid) -> StoreResult<()>;

    /// MATCHED -> OPEN, clearing the group reference. Used when a member
    /// never responded, and when a formation is rolled back.
    async fn release_to_open(&self, ids: &[Uuid]) -> StoreResult<()>;

    /// MATCHED -> CANCELLED (member explicitly declined). Keeps group_id
    /// clear per the status invariant.
    async fn mark_cancelled(&self, id: Uuid) -> StoreResult<()>;

    /// MATCHED -> CONVERTED (member confirmed and paid).
    async fn mark_converted(&self, id: Uuid) -> StoreResult<()>;
}
