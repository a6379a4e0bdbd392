use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use troupe_core::repository::{StoreError, StoreResult};
use troupe_group::models::{Confirmation, Group, GroupStatus};
use troupe_group::repository::GroupRepository;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    groups: HashMap<Uuid, Group>,
    confirmations: HashMap<Uuid, Confirmation>,
    /// Group -> owned confirmation ids, in member order.
    by_group: HashMap<Uuid, Vec<Uuid>>,
}

/// In-memory group aggregate store. `update_group` is a compare-and-swap on
/// the group's version; everything else relies on the workflow's per-group
/// critical section.
#[derive(Default)]
pub struct MemoryGroupRepository {
    inner: RwLock<Inner>,
}

impl MemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    async fn insert_group(
        &self,
        group: &Group,
        confirmations: &[Confirmation],
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.groups.contains_key(&group.id) {
            return Err(StoreError::Backend(format!(
                "group {} already exists",
                group.id
            )));
        }
        if confirmations.iter().any(|c| c.group_id != group.id) {
            return Err(StoreError::Backend(
                "confirmation does not belong to the inserted group".into(),
            ));
        }
        inner.groups.insert(group.id, group.clone());
        let ids: Vec<Uuid> = confirmations.iter().map(|c| c.id).collect();
        for confirmation in confirmations {
            inner
                .confirmations
                .insert(confirmation.id, confirmation.clone());
        }
        inner.by_group.insert(group.id, ids);
        Ok(())
    }

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        Ok(self.inner.read().await.groups.get(&id).cloned())
    }

    async fn list_groups(
        &self,
        destination_id: Option<Uuid>,
        status: Option<GroupStatus>,
    ) -> StoreResult<Vec<Group>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Group> = inner
            .groups
            .values()
            .filter(|g| destination_id.map_or(true, |d| g.destination_id == d))
            .filter(|g| status.map_or(true, |s| g.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update_group(&self, group: &Group) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .groups
            .get_mut(&group.id)
            .ok_or_else(|| StoreError::NotFound(group.id.to_string()))?;
        if stored.version != group.version {
            return Err(StoreError::VersionConflict(group.id.to_string()));
        }
        let mut next = group.clone();
        next.version += 1;
        *stored = next;
        Ok(())
    }

    async fn confirmations_for(&self, group_id: Uuid) -> StoreResult<Vec<Confirmation>> {
        let inner = self.inner.read().await;
        let ids = inner.by_group.get(&group_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| inner.confirmations.get(id).cloned())
            .collect())
    }

    async fn get_confirmation(&self, id: Uuid) -> StoreResult<Option<Confirmation>> {
        Ok(self.inner.read().await.confirmations.get(&id).cloned())
    }

    async fn find_by_token(
        &self,
        group_id: Uuid,
        token: &str,
    ) -> StoreResult<Option<Confirmation>> {
        let inner = self.inner.read().await;
        let ids = inner.by_group.get(&group_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| inner.confirmations.get(id))
            .find(|c| c.token == token)
            .cloned())
    }

    async fn update_confirmation(&self, confirmation: &Confirmation) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .confirmations
            .get_mut(&confirmation.id)
            .ok_or_else(|| StoreError::NotFound(confirmation.id.to_string()))?;
        *stored = confirmation.clone();
        Ok(())
    }

    async fn groups_with_expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for group_id in inner.groups.keys() {
            let has_expired = inner
                .by_group
                .get(group_id)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.confirmations.get(id))
                        .any(|c| c.is_expired_at(now))
                })
                .unwrap_or(false);
            if has_expired {
                out.push(*group_id);
            }
        }
        Ok(out)
    }
}
