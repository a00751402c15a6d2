use std::str::FromStr;

use crate::models::{Listing, PropertyType, TenantType};

use super::{AvailabilityGrid, FormError};

/// Editable, flat representation of one listing.
///
/// Numeric inputs are kept as the operator typed them and only parsed when
/// the draft is turned into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    /// Present when editing an existing listing
    pub id: Option<String>,
    pub title: String,
    pub location: String,
    pub postal_address: String,
    pub google_maps_link: String,
    pub property_type: PropertyType,
    pub description: String,
    pub price: String,
    pub market_price: String,
    pub phone: String,
    pub tenant_type: TenantType,
    pub capacity: String,
    pub restrictions: String,
    pub amenities: String,
    pub thumbnail: String,
    pub rating: String,
    pub rating_count: String,
    grid: AvailabilityGrid,
    gallery: Vec<String>,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingDraft {
    /// Blank draft for a new listing
    pub fn new() -> Self {
        Self {
            id: None,
            title: String::new(),
            location: "Jia Sarai, Near IIT Gate".to_string(),
            postal_address: String::new(),
            google_maps_link: String::new(),
            property_type: PropertyType::Pg,
            description: String::new(),
            price: String::new(),
            market_price: String::new(),
            phone: String::new(),
            tenant_type: TenantType::BoysOnly,
            capacity: "1".to_string(),
            restrictions: "No Smoking, No Drinking".to_string(),
            amenities: "WiFi, AC, RO Water".to_string(),
            thumbnail: String::new(),
            rating: "4.5".to_string(),
            rating_count: "10".to_string(),
            grid: AvailabilityGrid::default(),
            gallery: Vec::new(),
        }
    }

    /// Flatten a stored listing into an editable draft
    pub fn from_listing(listing: &Listing) -> Self {
        let record = &listing.record;
        let rules = &record.rules;

        let grid = match &rules.available_room_numbers {
            Some(rooms) => AvailabilityGrid::new(rules.total_units, rooms.iter().copied()),
            // Records written before per-room tracking only have a count
            None => {
                let count = rules.available_units.unwrap_or(0).min(rules.total_units);
                AvailabilityGrid::new(rules.total_units, 1..=count)
            }
        };

        Self {
            id: Some(listing.id.clone()),
            title: record.info.title.clone(),
            location: record.info.location.clone(),
            postal_address: record.info.postal_address.clone(),
            google_maps_link: record.info.google_maps_link.clone(),
            property_type: record.info.property_type,
            description: record.description.clone(),
            price: record.price.amount.to_string(),
            market_price: record
                .price
                .market_amount
                .map(|m| m.to_string())
                .unwrap_or_default(),
            phone: record.contact.phone.clone(),
            tenant_type: rules.tenant_type,
            capacity: rules.capacity.to_string(),
            restrictions: rules.restrictions.join(", "),
            amenities: record.amenities.join(", "),
            thumbnail: record.media.thumbnail.clone(),
            rating: record.rating.average.to_string(),
            rating_count: record.rating.count.to_string(),
            grid,
            gallery: record.media.gallery.clone(),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.id.is_some()
    }

    pub fn grid(&self) -> &AvailabilityGrid {
        &self.grid
    }

    pub fn gallery(&self) -> &[String] {
        &self.gallery
    }

    /// Replace one field with operator input
    pub fn set_field(&mut self, field: DraftField, value: &str) -> Result<(), FormError> {
        let text = value.to_string();
        match field {
            DraftField::Title => self.title = text,
            DraftField::Location => self.location = text,
            DraftField::PostalAddress => self.postal_address = text,
            DraftField::GoogleMapsLink => self.google_maps_link = text,
            DraftField::PropertyType => self.property_type = value.parse()?,
            DraftField::Description => self.description = text,
            DraftField::Price => self.price = text,
            DraftField::MarketPrice => self.market_price = text,
            DraftField::Phone => self.phone = text,
            DraftField::TenantType => self.tenant_type = value.parse()?,
            DraftField::Capacity => self.capacity = text,
            DraftField::TotalUnits => {
                let total = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| FormError::invalid("total_units", "must be a whole number"))?;
                self.grid.resize(total)?;
            }
            DraftField::Restrictions => self.restrictions = text,
            DraftField::Amenities => self.amenities = text,
            DraftField::Thumbnail => self.thumbnail = text,
            DraftField::Rating => self.rating = text,
            DraftField::RatingCount => self.rating_count = text,
        }
        Ok(())
    }

    /// Flip a unit in the availability grid
    pub fn toggle_unit(&mut self, unit: u32) -> Result<bool, FormError> {
        self.grid.toggle(unit)
    }

    pub fn set_thumbnail(&mut self, url: impl Into<String>) {
        self.thumbnail = url.into();
    }

    pub fn add_gallery_image(&mut self, url: impl Into<String>) {
        self.gallery.push(url.into());
    }

    /// Remove the image at `index`, keeping the order of the rest
    pub fn remove_gallery_image(&mut self, index: usize) -> Option<String> {
        (index < self.gallery.len()).then(|| self.gallery.remove(index))
    }
}

/// Fields the operator can edit by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Location,
    PostalAddress,
    GoogleMapsLink,
    PropertyType,
    Description,
    Price,
    MarketPrice,
    Phone,
    TenantType,
    Capacity,
    TotalUnits,
    Restrictions,
    Amenities,
    Thumbnail,
    Rating,
    RatingCount,
}

impl DraftField {
    pub const ALL: [(&'static str, DraftField); 17] = [
        ("title", DraftField::Title),
        ("location", DraftField::Location),
        ("address", DraftField::PostalAddress),
        ("maps", DraftField::GoogleMapsLink),
        ("type", DraftField::PropertyType),
        ("description", DraftField::Description),
        ("price", DraftField::Price),
        ("market_price", DraftField::MarketPrice),
        ("phone", DraftField::Phone),
        ("tenant_type", DraftField::TenantType),
        ("capacity", DraftField::Capacity),
        ("total_units", DraftField::TotalUnits),
        ("restrictions", DraftField::Restrictions),
        ("amenities", DraftField::Amenities),
        ("thumbnail", DraftField::Thumbnail),
        ("rating", DraftField::Rating),
        ("rating_count", DraftField::RatingCount),
    ];
}

impl FromStr for DraftField {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, field)| *field)
            .ok_or_else(|| FormError::UnknownField(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingRecord, ListingStatus, Rules};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn stored(id: &str, value: serde_json::Value) -> Listing {
        Listing {
            id: id.to_string(),
            record: serde_json::from_value::<ListingRecord>(value).unwrap(),
        }
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = ListingDraft::new();
        assert!(!draft.is_editing());
        assert_eq!(draft.property_type, PropertyType::Pg);
        assert_eq!(draft.tenant_type, TenantType::BoysOnly);
        assert_eq!(draft.rating, "4.5");
        assert_eq!(draft.grid().total_units(), 1);
        assert_eq!(draft.grid().available_units(), 0);
        assert!(draft.gallery().is_empty());
    }

    #[test]
    fn test_from_listing_flattens_groups() {
        let listing = stored(
            "abc",
            json!({
                "info": { "title": "Green Nest", "location": "Ber Sarai", "type": "Flat" },
                "price": { "amount": 12000.0, "marketAmount": 14000.0 },
                "media": { "thumbnail": "https://cdn/t.jpg", "gallery": ["https://cdn/1.jpg"] },
                "rules": {
                    "tenantType": "Family",
                    "capacity": 3,
                    "restrictions": ["No Pets", "No Smoking"],
                    "totalUnits": 4,
                    "availableUnits": 2,
                    "availableRoomNumbers": [1, 4]
                },
                "amenities": ["WiFi", "AC"],
                "contact": { "phone": "9999900000" },
                "rating": { "average": 4.2, "count": 31 },
                "description": "Quiet lane",
                "status": "booked",
                "createdAt": "2024-03-01T08:00:00Z"
            }),
        );

        let draft = ListingDraft::from_listing(&listing);
        assert_eq!(draft.id.as_deref(), Some("abc"));
        assert_eq!(draft.title, "Green Nest");
        assert_eq!(draft.property_type, PropertyType::Flat);
        assert_eq!(draft.price, "12000");
        assert_eq!(draft.market_price, "14000");
        assert_eq!(draft.tenant_type, TenantType::Family);
        assert_eq!(draft.restrictions, "No Pets, No Smoking");
        assert_eq!(draft.amenities, "WiFi, AC");
        assert_eq!(draft.rating, "4.2");
        assert_eq!(draft.rating_count, "31");
        assert_eq!(draft.grid().available_room_numbers(), vec![1, 4]);
        assert_eq!(draft.gallery(), ["https://cdn/1.jpg".to_string()]);
    }

    #[test]
    fn test_from_listing_defaults_missing_fields() {
        let listing = stored("old", json!({ "createdAt": "2023-01-01T00:00:00Z" }));
        let draft = ListingDraft::from_listing(&listing);

        assert_eq!(draft.rating, "4.5");
        assert_eq!(draft.tenant_type, TenantType::BoysOnly);
        assert_eq!(draft.grid().total_units(), 1);
        assert_eq!(draft.market_price, "");
    }

    #[test]
    fn test_legacy_count_hydrates_leading_units() {
        let listing = Listing {
            id: "legacy".into(),
            record: ListingRecord {
                info: Default::default(),
                price: Default::default(),
                media: Default::default(),
                rules: Rules {
                    total_units: 5,
                    available_units: Some(3),
                    ..Rules::default()
                },
                amenities: vec![],
                contact: Default::default(),
                rating: Default::default(),
                description: String::new(),
                status: ListingStatus::Available,
                created_at: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            },
        };

        let draft = ListingDraft::from_listing(&listing);
        assert_eq!(draft.grid().available_room_numbers(), vec![1, 2, 3]);
        assert_eq!(draft.grid().available_units(), 3);
    }

    #[test]
    fn test_set_field_by_name() {
        let mut draft = ListingDraft::new();
        let field: DraftField = "tenant-type".parse().unwrap();
        draft.set_field(field, "girls only").unwrap();
        assert_eq!(draft.tenant_type, TenantType::GirlsOnly);

        draft.set_field(DraftField::Price, "8500").unwrap();
        assert_eq!(draft.price, "8500");

        assert!(draft.set_field(DraftField::PropertyType, "Villa").is_err());
        assert!(matches!(
            "colour".parse::<DraftField>(),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_total_units_resizes_grid() {
        let mut draft = ListingDraft::new();
        draft.set_field(DraftField::TotalUnits, "6").unwrap();
        draft.toggle_unit(5).unwrap();
        draft.toggle_unit(2).unwrap();

        draft.set_field(DraftField::TotalUnits, "3").unwrap();
        assert_eq!(draft.grid().available_room_numbers(), vec![2]);
        assert!(draft.set_field(DraftField::TotalUnits, "three").is_err());
        assert!(draft.set_field(DraftField::TotalUnits, "0").is_err());
        assert_eq!(draft.grid().total_units(), 3);
    }

    #[test]
    fn test_gallery_removal_is_positional() {
        let mut draft = ListingDraft::new();
        for url in ["a", "b", "c"] {
            draft.add_gallery_image(url);
        }

        assert_eq!(draft.remove_gallery_image(1).as_deref(), Some("b"));
        assert_eq!(draft.gallery(), ["a".to_string(), "c".to_string()]);
        assert_eq!(draft.remove_gallery_image(7), None);
        assert_eq!(draft.gallery().len(), 2);
    }
}
