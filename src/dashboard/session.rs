use crate::form::{build_payload, Carry, FormError, ListingDraft};
use crate::models::{Listing, ListingRecord};

/// The one open editor: a draft plus what it carries over on save
#[derive(Debug, Clone)]
pub struct EditSession {
    pub draft: ListingDraft,
    /// `None` until the listing is first saved
    carry: Option<Carry>,
}

impl EditSession {
    pub fn create() -> Self {
        Self {
            draft: ListingDraft::new(),
            carry: None,
        }
    }

    pub fn edit(listing: &Listing) -> Self {
        Self {
            draft: ListingDraft::from_listing(listing),
            carry: Some(Carry::from(&listing.record)),
        }
    }

    /// Id of the listing being edited, `None` for a new one
    pub fn listing_id(&self) -> Option<&str> {
        self.draft.id.as_deref()
    }

    /// Record to write now. A new listing is stamped with the current time.
    pub fn payload(&self) -> Result<ListingRecord, FormError> {
        build_payload(&self.draft, self.carry.unwrap_or_else(Carry::fresh))
    }
}
