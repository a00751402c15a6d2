//! Listing collection view.
//!
//! Owns the live listing feed and the browsing/editing mode switch. Every
//! command reaches the store directly; the local listing set only changes
//! when the feed delivers the store's next snapshot.

pub mod render;
pub mod session;

pub use session::EditSession;

use std::sync::Arc;

use tracing::{info, warn};

use crate::form::FormError;
use crate::models::{Listing, ListingStatus};
use crate::store::{ListingStore, Snapshot, StoreError, Subscription};
use crate::upload::{upload_batch, MediaUploader, UploadError, UploadFile};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("finish or cancel the open editor first")]
    Busy,

    #[error("no listing is being edited")]
    NotEditing,

    #[error("no listing with id {0}")]
    UnknownListing(String),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Transient progress message
    Status,
    /// Failure the operator has to acknowledge
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug)]
pub enum Mode {
    Browsing,
    Editing(EditSession),
}

/// A delete the operator still has to confirm
#[derive(Debug)]
pub struct PendingDelete {
    id: String,
    title: String,
}

impl PendingDelete {
    pub fn prompt(&self) -> String {
        format!(
            "⚠️  Delete '{}'? This cannot be undone. [y/N]",
            self.title
        )
    }
}

pub struct Dashboard {
    store: Arc<dyn ListingStore>,
    uploader: Arc<dyn MediaUploader>,
    subscription: Subscription,
    listings: Vec<Listing>,
    unreadable: Vec<String>,
    loaded: bool,
    mode: Mode,
    notices: Vec<Notice>,
}

impl Dashboard {
    /// Subscribe to the store and start in browsing mode
    pub async fn mount(
        store: Arc<dyn ListingStore>,
        uploader: Arc<dyn MediaUploader>,
    ) -> Result<Self, DashboardError> {
        let subscription = store.subscribe().await?;
        info!(
            "Dashboard mounted on {} store, images via {}",
            store.backend_name(),
            uploader.host_name()
        );

        let mut dashboard = Self {
            store,
            uploader,
            subscription,
            listings: Vec::new(),
            unreadable: Vec::new(),
            loaded: false,
            mode: Mode::Browsing,
            notices: Vec::new(),
        };
        dashboard.sync();
        Ok(dashboard)
    }

    /// Release the live feed
    pub fn unmount(self) {
        self.subscription.unsubscribe();
    }

    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn session(&self) -> Option<&EditSession> {
        match &self.mode {
            Mode::Editing(session) => Some(session),
            Mode::Browsing => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        match &mut self.mode {
            Mode::Editing(session) => Some(session),
            Mode::Browsing => None,
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Adopt the feed's latest snapshot if there is a new one
    pub fn sync(&mut self) -> bool {
        if self.loaded && !self.subscription.has_changed() {
            return false;
        }
        self.adopt()
    }

    /// Wait until the feed delivers a new snapshot, then adopt it
    pub async fn wait_for_update(&mut self) -> Result<(), DashboardError> {
        self.subscription.changed().await?;
        self.adopt();
        Ok(())
    }

    fn adopt(&mut self) -> bool {
        let Some(snapshot) = self.subscription.latest() else {
            return false;
        };
        let Snapshot {
            listings,
            unreadable,
        } = snapshot;

        if !unreadable.is_empty() && unreadable != self.unreadable {
            self.alert(format!(
                "{} stored listing(s) could not be read: {}",
                unreadable.len(),
                unreadable.join(", ")
            ));
        }
        self.unreadable = unreadable;
        self.listings = listings;
        self.loaded = true;
        true
    }

    pub fn begin_create(&mut self) -> Result<(), DashboardError> {
        self.ensure_browsing()?;
        self.mode = Mode::Editing(EditSession::create());
        Ok(())
    }

    pub fn begin_edit(&mut self, id: &str) -> Result<(), DashboardError> {
        self.ensure_browsing()?;
        let session = EditSession::edit(self.find(id)?);
        self.mode = Mode::Editing(session);
        Ok(())
    }

    /// Discard the open draft. Returns false if nothing was open.
    pub fn cancel(&mut self) -> bool {
        matches!(
            std::mem::replace(&mut self.mode, Mode::Browsing),
            Mode::Editing(_)
        )
    }

    /// Save the open draft. On any failure the editor stays open with the draft intact.
    pub async fn submit(&mut self) -> Result<String, DashboardError> {
        let session = self.session().ok_or(DashboardError::NotEditing)?;
        let existing = session.listing_id().map(String::from);

        let record = match session.payload() {
            Ok(record) => record,
            Err(e) => {
                self.alert(format!("Cannot save: {}", e));
                return Err(e.into());
            }
        };

        let saved = match existing {
            Some(id) => self.store.replace(&id, record).await.map(|_| id),
            None => self.store.insert(record).await,
        };

        match saved {
            Ok(id) => {
                info!("✅ Saved listing {}", id);
                self.mode = Mode::Browsing;
                Ok(id)
            }
            Err(e) => {
                self.alert(format!("Save failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Read a local image, raising an alert if it can't be read
    pub async fn read_image(&mut self, path: &str) -> Result<UploadFile, DashboardError> {
        match UploadFile::from_path(path).await {
            Ok(file) => Ok(file),
            Err(e) => {
                self.alert(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Read gallery images; unreadable files are alerted and left out
    pub async fn read_images(&mut self, paths: &[&str]) -> Vec<UploadFile> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if let Ok(file) = self.read_image(path).await {
                files.push(file);
            }
        }
        files
    }

    /// Upload one image and make it the thumbnail
    pub async fn upload_thumbnail(&mut self, file: UploadFile) -> Result<(), DashboardError> {
        self.session().ok_or(DashboardError::NotEditing)?;
        self.status(format!("Uploading to {}...", self.uploader.host_name()));

        match self.uploader.upload(file).await {
            Ok(url) => {
                if let Some(session) = self.session_mut() {
                    session.draft.set_thumbnail(url);
                }
                self.status("✅ Success!".to_string());
                Ok(())
            }
            Err(e) => {
                self.status("❌ Failed.".to_string());
                self.alert(format!("Upload failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Upload images in order and append each success to the gallery.
    /// Returns how many were added.
    pub async fn upload_gallery(&mut self, files: Vec<UploadFile>) -> Result<usize, DashboardError> {
        self.session().ok_or(DashboardError::NotEditing)?;
        self.status(format!("Uploading to {}...", self.uploader.host_name()));

        let outcomes = upload_batch(self.uploader.as_ref(), files).await;
        let mut added = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(url) => {
                    if let Some(session) = self.session_mut() {
                        session.draft.add_gallery_image(url);
                        added += 1;
                    }
                }
                Err(e) => {
                    self.status("❌ Failed.".to_string());
                    self.alert(format!("Upload of {} failed: {}", outcome.file_name, e));
                }
            }
        }
        if added > 0 {
            self.status(format!("✅ Success! {} image(s) added", added));
        }
        Ok(added)
    }

    /// Flip a listing between available and booked. The view changes once the feed catches up.
    pub async fn toggle_status(&mut self, id: &str) -> Result<ListingStatus, DashboardError> {
        self.ensure_browsing()?;
        let next = self.find(id)?.record.status.toggled();

        match self.store.set_status(id, next).await {
            Ok(()) => Ok(next),
            Err(e) => {
                self.alert(format!("Could not update status: {}", e));
                Err(e.into())
            }
        }
    }

    /// First step of a delete; nothing is removed until the returned token is confirmed
    pub fn request_delete(&self, id: &str) -> Result<PendingDelete, DashboardError> {
        self.ensure_browsing()?;
        let listing = self.find(id)?;
        Ok(PendingDelete {
            id: listing.id.clone(),
            title: listing.record.info.title.clone(),
        })
    }

    pub async fn confirm_delete(&mut self, pending: PendingDelete) -> Result<(), DashboardError> {
        match self.store.delete(&pending.id).await {
            Ok(()) => {
                self.status(format!("Deleted '{}'", pending.title));
                Ok(())
            }
            Err(e) => {
                self.alert(format!("Delete failed: {}", e));
                Err(e.into())
            }
        }
    }

    fn ensure_browsing(&self) -> Result<(), DashboardError> {
        match self.mode {
            Mode::Browsing => Ok(()),
            Mode::Editing(_) => Err(DashboardError::Busy),
        }
    }

    fn find(&self, id: &str) -> Result<&Listing, DashboardError> {
        self.listings
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| DashboardError::UnknownListing(id.to_string()))
    }

    fn status(&mut self, message: String) {
        self.notices.push(Notice {
            level: NoticeLevel::Status,
            message,
        });
    }

    fn alert(&mut self, message: String) {
        warn!("{}", message);
        self.notices.push(Notice {
            level: NoticeLevel::Alert,
            message,
        });
    }
}
