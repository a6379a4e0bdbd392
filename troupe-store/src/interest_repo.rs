use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use troupe_core::interest::{Interest, InterestStatus};
use troupe_core::repository::{InterestRepository, StoreError, StoreResult};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    interests: HashMap<Uuid, Interest>,
    /// Idempotency index: client_uuid -> interest id.
    by_client: HashMap<String, Uuid>,
}

/// In-memory interest store. All mutation happens under one write lock, so
/// the claim path is a genuine atomic transition, not read-then-write.
#[derive(Default)]
pub struct MemoryInterestRepository {
    inner: RwLock<Inner>,
}

impl MemoryInterestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InterestRepository for MemoryInterestRepository {
    async fn create(&self, interest: Interest) -> StoreResult<(Interest, bool)> {
        let mut inner = self.inner.write().await;
        if let Some(existing_id) = inner.by_client.get(&interest.client_uuid) {
            let existing = inner
                .interests
                .get(existing_id)
                .cloned()
                .ok_or_else(|| StoreError::Backend("idempotency index out of sync".into()))?;
            return Ok((existing, false));
        }
        inner
            .by_client
            .insert(interest.client_uuid.clone(), interest.id);
        inner.interests.insert(interest.id, interest.clone());
        Ok((interest, true))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Interest>> {
        Ok(self.inner.read().await.interests.get(&id).cloned())
    }

    async fn list(
        &self,
        destination_id: Option<Uuid>,
        status: Option<InterestStatus>,
    ) -> StoreResult<Vec<Interest>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Interest> = inner
            .interests
            .values()
            .filter(|i| destination_id.map_or(true, |d| i.destination_id == d))
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        out.sort_by_key(|i| i.created_at);
        Ok(out)
    }

    async fn open_for_destination(&self, destination_id: Uuid) -> StoreResult<Vec<Interest>> {
        self.list(Some(destination_id), Some(InterestStatus::Open))
            .await
    }

    async fn destinations_with_open(&self) -> StoreResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        let mut destinations: Vec<Uuid> = inner
            .interests
            .values()
            .filter(|i| i.is_open())
            .map(|i| i.destination_id)
            .collect();
        destinations.sort();
        destinations.dedup();
        Ok(destinations)
    }

    async fn claim_for_group(&self, ids: &[Uuid], group_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        // Validate the whole claim before touching anything.
        for id in ids {
            match inner.interests.get(id) {
                Some(i) if i.is_open() => {}
                Some(_) => return Err(StoreError::ClaimConflict(id.to_string())),
                None => return Err(StoreError::NotFound(id.to_string())),
            }
        }
        let now = Utc::now();
        for id in ids {
            if let Some(interest) = inner.interests.get_mut(id) {
                interest.status = InterestStatus::Matched;
                interest.group_id = Some(group_id);
                interest.updated_at = now;
            }
        }
        Ok(())
    }

    async fn release_to_open(&self, ids: &[Uuid]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        for id in ids {
            if let Some(interest) = inner.interests.get_mut(id) {
                if interest.status == InterestStatus::Matched {
                    interest.status = InterestStatus::Open;
                    interest.group_id = None;
                    interest.updated_at = now;
                }
            }
        }
        Ok(())
    }

    async fn mark_cancelled(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let interest = inner
            .interests
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match interest.status {
            InterestStatus::Matched => {
                interest.status = InterestStatus::Cancelled;
                interest.group_id = None;
                interest.updated_at = Utc::now();
                Ok(())
            }
            InterestStatus::Cancelled => Ok(()),
            other => Err(StoreError::Backend(format!(
                "cannot cancel interest {} from {:?}",
                id, other
            ))),
        }
    }

    async fn mark_converted(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let interest = inner
            .interests
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match interest.status {
            InterestStatus::Matched => {
                interest.status = InterestStatus::Converted;
                interest.updated_at = Utc::now();
                Ok(())
            }
            InterestStatus::Converted => Ok(()),
            other => Err(StoreError::Backend(format!(
                "cannot convert interest {} from {:?}",
                id, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use troupe_core::interest::NewInterest;

    fn new_interest(client_uuid: &str) -> Interest {
        NewInterest {
            destination_id: Uuid::new_v4(),
            user_name: "Tess".into(),
            user_email: "tess@example.com".into(),
            user_phone: None,
            num_people: 2,
            date_from: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            budget_min: None,
            budget_max: None,
            special_requests: None,
            client_uuid: client_uuid.into(),
        }
        .into_interest()
    }

    #[tokio::test]
    async fn same_client_uuid_stores_exactly_one_interest() {
        let repo = MemoryInterestRepository::new();
        let (first, created) = repo.create(new_interest("abc")).await.unwrap();
        assert!(created);
        let (second, created) = repo.create(new_interest("abc")).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(repo.list(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_is_all_or_nothing() {
        let repo = MemoryInterestRepository::new();
        let (a, _) = repo.create(new_interest("a")).await.unwrap();
        let (b, _) = repo.create(new_interest("b")).await.unwrap();

        let group = Uuid::new_v4();
        repo.claim_for_group(&[a.id, b.id], group).await.unwrap();

        // A second claim over an already-matched interest fails entirely.
        let (c, _) = repo.create(new_interest("c")).await.unwrap();
        let err = repo
            .claim_for_group(&[c.id, a.id], Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ClaimConflict(_)));
        let c_after = repo.get(c.id).await.unwrap().unwrap();
        assert!(c_after.is_open(), "losing claim must not touch members");
    }

    #[tokio::test]
    async fn release_restores_open_and_clears_group() {
        let repo = MemoryInterestRepository::new();
        let (a, _) = repo.create(new_interest("a")).await.unwrap();
        let group = Uuid::new_v4();
        repo.claim_for_group(&[a.id], group).await.unwrap();
        repo.release_to_open(&[a.id]).await.unwrap();

        let after = repo.get(a.id).await.unwrap().unwrap();
        assert_eq!(after.status, InterestStatus::Open);
        assert!(after.group_id.is_none());
    }
}
