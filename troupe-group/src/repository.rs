use async_trait::async_trait;
use chrono::{DateTime, Utc};
use troupe_core::repository::StoreResult;
use uuid::Uuid;

use crate::models::{Confirmation, Group, GroupStatus};

/// Group aggregate persistence. A group exclusively owns its confirmations;
/// both are inserted together and queried through the group id.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Insert a freshly formed group together with its pending confirmations.
    async fn insert_group(
        &self,
        group: &Group,
        confirmations: &[Confirmation],
    ) -> StoreResult<()>;

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<Group>>;

    async fn list_groups(
        &self,
        destination_id: Option<Uuid>,
        status: Option<GroupStatus>,
    ) -> StoreResult<Vec<Group>>;

    /// Compare-and-swap on `group.version`: fails with `VersionConflict`
    /// when the stored version differs, bumps it on success.
    async fn update_group(&self, group: &Group) -> StoreResult<()>;

    async fn confirmations_for(&self, group_id: Uuid) -> StoreResult<Vec<Confirmation>>;

    async fn get_confirmation(&self, id: Uuid) -> StoreResult<Option<Confirmation>>;

    /// Resolve a response token inside one group.
    async fn find_by_token(&self, group_id: Uuid, token: &str) -> StoreResult<Option<Confirmation>>;

    async fn update_confirmation(&self, confirmation: &Confirmation) -> StoreResult<()>;

    /// Ids of groups holding at least one pending confirmation whose deadline
    /// has passed at `now`. Drives the periodic sweep; terminal groups are
    /// included so their stragglers still resolve.
    async fn groups_with_expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>>;
}
