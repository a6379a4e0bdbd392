use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use troupe_catalog::{Destination, DestinationRepository};
use troupe_core::repository::{StoreError, StoreResult};
use uuid::Uuid;

/// In-memory destination catalog, loaded once at boot. Destination CRUD is an
/// external admin surface; the engine only reads.
pub struct MemoryDestinationRepository {
    inner: RwLock<HashMap<Uuid, Destination>>,
}

impl MemoryDestinationRepository {
    pub fn with_destinations(destinations: Vec<Destination>) -> Self {
        let map = destinations.into_iter().map(|d| (d.id, d)).collect();
        Self {
            inner: RwLock::new(map),
        }
    }

    /// Load the catalog from a JSON file (see `config/destinations.json`).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StoreError::Backend(format!("catalog file: {}", e)))?;
        let destinations: Vec<Destination> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Backend(format!("catalog parse: {}", e)))?;
        tracing::info!(count = destinations.len(), "destination catalog loaded");
        Ok(Self::with_destinations(destinations))
    }
}

#[async_trait]
impl DestinationRepository for MemoryDestinationRepository {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Destination>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn list_active(&self) -> StoreResult<Vec<Destination>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Destination> = inner.values().filter(|d| d.is_active).cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
