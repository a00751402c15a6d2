use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Listing, ListingRecord, ListingStatus};

use super::{ListingStore, Snapshot, StoreError, Subscription};

/// Process-local store, used offline and in tests
pub struct MemoryStore {
    records: RwLock<HashMap<String, ListingRecord>>,
    feed: watch::Sender<Option<Snapshot>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Some(Snapshot::default()));
        Self {
            records: RwLock::new(HashMap::new()),
            feed,
        }
    }

    /// Store seeded with existing records under fixed ids
    pub fn with_records(records: impl IntoIterator<Item = (String, ListingRecord)>) -> Self {
        let records: HashMap<_, _> = records.into_iter().collect();
        let (feed, _) = watch::channel(Some(Snapshot::new(ordered(&records))));
        Self {
            records: RwLock::new(records),
            feed,
        }
    }

    fn publish(&self, records: &HashMap<String, ListingRecord>) {
        let snapshot = ordered(records);
        debug!("Publishing {} listings", snapshot.len());
        self.feed.send_replace(Some(Snapshot::new(snapshot)));
    }
}

fn ordered(records: &HashMap<String, ListingRecord>) -> Vec<Listing> {
    let mut listings: Vec<Listing> = records
        .iter()
        .map(|(id, record)| Listing {
            id: id.clone(),
            record: record.clone(),
        })
        .collect();
    listings.sort_by(|a, b| {
        b.record
            .created_at
            .cmp(&a.record.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    listings
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        Ok(Subscription::new(self.feed.subscribe()))
    }

    async fn insert(&self, record: ListingRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut records = self.records.write().await;
        records.insert(id.clone(), record);
        self.publish(&records);
        Ok(id)
    }

    async fn replace(&self, id: &str, record: ListingRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = record;
        self.publish(&records);
        Ok(())
    }

    async fn set_status(&self, id: &str, status: ListingStatus) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        slot.status = status;
        self.publish(&records);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.publish(&records);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
