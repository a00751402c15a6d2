pub mod auth;
pub mod firestore;
pub mod memory;
pub mod traits;
pub mod value;

pub use auth::AnonymousAuth;
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use traits::ListingStore;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::Listing;

/// Name of the collection holding the listings
pub const COLLECTION: &str = "properties";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("listing {0} not found")]
    NotFound(String),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("could not start a session: {0}")]
    Auth(String),

    #[error("listing feed closed")]
    FeedClosed,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// One reading of the collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Readable listings, newest first
    pub listings: Vec<Listing>,
    /// Ids of stored documents that could not be read as listings
    pub unreadable: Vec<String>,
}

impl Snapshot {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            unreadable: Vec::new(),
        }
    }
}

/// Live view of the listing set, newest first.
///
/// Holds `None` until the first snapshot arrives. Dropping the subscription
/// stops its feed.
pub struct Subscription {
    receiver: watch::Receiver<Option<Snapshot>>,
    _feed: Option<FeedTask>,
}

struct FeedTask(JoinHandle<()>);

impl Drop for FeedTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Subscription {
    pub(crate) fn new(receiver: watch::Receiver<Option<Snapshot>>) -> Self {
        Self {
            receiver,
            _feed: None,
        }
    }

    /// Subscription whose feed is driven by a background task owned by the subscriber
    pub(crate) fn with_task(
        receiver: watch::Receiver<Option<Snapshot>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            _feed: Some(FeedTask(task)),
        }
    }

    /// Most recent snapshot, marking it as seen
    pub fn latest(&mut self) -> Option<Snapshot> {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a snapshot arrived that `latest` hasn't returned yet
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next snapshot
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StoreError::FeedClosed)
    }

    pub fn unsubscribe(self) {}
}
