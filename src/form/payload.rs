use chrono::{DateTime, SubsecRound, Utc};

use crate::models::{
    Contact, ListingInfo, ListingRecord, ListingStatus, Media, Pricing, Rating, Rules,
};

use super::{parse_list, FormError, ListingDraft};

/// Values a save carries over from the stored record instead of the form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Carry {
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Carry {
    /// For a listing that has never been saved.
    /// Timestamps are kept at the microsecond precision the backend stores.
    pub fn fresh() -> Self {
        Self {
            status: ListingStatus::Available,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

impl From<&ListingRecord> for Carry {
    fn from(record: &ListingRecord) -> Self {
        Self {
            status: record.status,
            created_at: record.created_at,
        }
    }
}

/// Normalise a draft into the stored record shape, rejecting invalid input
pub fn build_payload(draft: &ListingDraft, carry: Carry) -> Result<ListingRecord, FormError> {
    let title = required("title", &draft.title)?;
    let location = required("location", &draft.location)?;
    let phone = required("phone", &draft.phone)?;

    let amount = parse_amount("price", &draft.price)?
        .ok_or(FormError::Required { field: "price" })?;
    let market_amount = parse_amount("market_price", &draft.market_price)?;

    let capacity = parse_count("capacity", &draft.capacity)?;
    if capacity == 0 {
        return Err(FormError::invalid("capacity", "must be at least 1"));
    }

    let average = draft
        .rating
        .trim()
        .parse::<f64>()
        .map_err(|_| FormError::invalid("rating", "must be a number"))?;
    if !(0.0..=5.0).contains(&average) {
        return Err(FormError::invalid("rating", "must be between 0 and 5"));
    }
    let count = parse_count("rating_count", &draft.rating_count)?;

    let grid = draft.grid();

    Ok(ListingRecord {
        info: ListingInfo {
            title,
            location,
            property_type: draft.property_type,
            google_maps_link: draft.google_maps_link.trim().to_string(),
            postal_address: draft.postal_address.trim().to_string(),
        },
        price: Pricing {
            amount,
            market_amount,
        },
        media: Media {
            thumbnail: draft.thumbnail.clone(),
            gallery: draft.gallery().to_vec(),
        },
        rules: Rules {
            tenant_type: draft.tenant_type,
            capacity,
            restrictions: parse_list(&draft.restrictions),
            total_units: grid.total_units(),
            available_units: Some(grid.available_units()),
            available_room_numbers: Some(grid.available_room_numbers()),
        },
        amenities: parse_list(&draft.amenities),
        contact: Contact { phone },
        rating: Rating { average, count },
        description: draft.description.clone(),
        status: carry.status,
        created_at: carry.created_at,
    })
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Required { field });
    }
    Ok(value.to_string())
}

/// Empty input is `None`; anything else must be a finite, non-negative number
fn parse_amount(field: &'static str, value: &str) -> Result<Option<f64>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let amount = value
        .parse::<f64>()
        .map_err(|_| FormError::invalid(field, format!("'{}' is not a number", value)))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(FormError::invalid(field, "must be zero or more"));
    }
    Ok(Some(amount))
}

fn parse_count(field: &'static str, value: &str) -> Result<u32, FormError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| FormError::invalid(field, "must be a whole number"))
}
