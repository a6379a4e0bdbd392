pub mod clusterer;
pub mod compat;

pub use clusterer::{ClusterEngine, ClusterRunReport, ClusterSettings};

use troupe_core::repository::StoreError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Destination not found: {0}")]
    DestinationNotFound(Uuid),

    #[error("Destination is not accepting interests: {0}")]
    DestinationInactive(Uuid),

    #[error("Interest is not open for matching: {0}")]
    InterestNotEligible(Uuid),

    #[error("Selected interests cannot form a group: {0}")]
    IncompatibleSelection(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
