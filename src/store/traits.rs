use crate::models::{ListingRecord, ListingStatus};
use async_trait::async_trait;

use super::{StoreError, Subscription};

/// Persistence backend for listings.
/// Writes are reflected to subscribers through their feed, never by the caller.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Live, creation-time-descending view of every listing
    async fn subscribe(&self) -> Result<Subscription, StoreError>;

    /// Store a new listing and return its assigned id
    async fn insert(&self, record: ListingRecord) -> Result<String, StoreError>;

    /// Overwrite every field group of an existing listing
    async fn replace(&self, id: &str, record: ListingRecord) -> Result<(), StoreError>;

    /// Update only the `status` group
    async fn set_status(&self, id: &str, status: ListingStatus) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}
