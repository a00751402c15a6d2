use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod lenient;

/// Kind of rental unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PropertyType {
    #[default]
    #[serde(rename = "PG")]
    Pg,
    Room,
    Flat,
}

impl PropertyType {
    pub const ALL: [PropertyType; 3] = [PropertyType::Pg, PropertyType::Room, PropertyType::Flat];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Pg => "PG",
            PropertyType::Room => "Room",
            PropertyType::Flat => "Flat",
        }
    }
}

/// Who the listing is let to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TenantType {
    #[default]
    #[serde(rename = "Boys Only")]
    BoysOnly,
    #[serde(rename = "Girls Only")]
    GirlsOnly,
    Family,
    Any,
}

impl TenantType {
    pub const ALL: [TenantType; 4] = [
        TenantType::BoysOnly,
        TenantType::GirlsOnly,
        TenantType::Family,
        TenantType::Any,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantType::BoysOnly => "Boys Only",
            TenantType::GirlsOnly => "Girls Only",
            TenantType::Family => "Family",
            TenantType::Any => "Any",
        }
    }
}

/// Whether a listing is live or sold out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Available,
    Booked,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Booked => "booked",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ListingStatus::Available => ListingStatus::Booked,
            ListingStatus::Booked => ListingStatus::Available,
        }
    }
}

/// Error for enum values that don't match any wire string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

fn parse_variant<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    name: fn(&T) -> &'static str,
) -> Result<T, UnknownVariant> {
    let wanted = value.trim();
    all.iter()
        .find(|v| name(v).eq_ignore_ascii_case(wanted))
        .copied()
        .ok_or_else(|| UnknownVariant {
            kind,
            value: wanted.to_string(),
            expected: all.iter().map(name).collect::<Vec<_>>().join(", "),
        })
}

impl FromStr for PropertyType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("property type", s, &Self::ALL, Self::as_str)
    }
}

impl FromStr for TenantType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("tenant type", s, &Self::ALL, Self::as_str)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TenantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive information about a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingInfo {
    pub title: String,
    /// Short area label, e.g. "Jia Sarai, Near IIT"
    pub location: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub google_maps_link: String,
    pub postal_address: String,
}

/// Monthly rent and the optional market reference price
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Pricing {
    #[serde(deserialize_with = "lenient::amount")]
    pub amount: f64,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_amount"
    )]
    pub market_amount: Option<f64>,
}

/// Hosted image URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Media {
    pub thumbnail: String,
    pub gallery: Vec<String>,
}

/// Occupancy rules and the room availability grid.
///
/// `available_room_numbers` was added after the first records were written;
/// older records only carry the `available_units` count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Rules {
    pub tenant_type: TenantType,
    #[serde(deserialize_with = "lenient::at_least_one")]
    pub capacity: u32,
    pub restrictions: Vec<String>,
    #[serde(deserialize_with = "lenient::at_least_one")]
    pub total_units: u32,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_count"
    )]
    pub available_units: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::unit_numbers"
    )]
    pub available_room_numbers: Option<Vec<u32>>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            tenant_type: TenantType::BoysOnly,
            capacity: 1,
            restrictions: Vec::new(),
            total_units: 1,
            available_units: None,
            available_room_numbers: None,
        }
    }
}

impl Rules {
    /// Available unit count, preferring the unit-number set over the legacy count
    pub fn available_count(&self) -> u32 {
        match &self.available_room_numbers {
            Some(rooms) => rooms.len() as u32,
            None => self.available_units.unwrap_or(0),
        }
    }

    /// "available/total" pair, only for multi-unit listings
    pub fn availability(&self) -> Option<(u32, u32)> {
        (self.total_units > 1).then(|| (self.available_count(), self.total_units))
    }
}

/// Owner contact details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub phone: String,
}

/// Review summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Rating {
    #[serde(deserialize_with = "lenient::rating_average")]
    pub average: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub count: u32,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            average: 4.5,
            count: 0,
        }
    }
}

/// A listing as stored in the `properties` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    #[serde(default)]
    pub info: ListingInfo,
    #[serde(default)]
    pub price: Pricing,
    #[serde(default)]
    pub media: Media,
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl ListingRecord {
    /// Top-level groups written by a full-record replace
    pub const FIELD_GROUPS: [&'static str; 10] = [
        "info",
        "price",
        "media",
        "rules",
        "amenities",
        "contact",
        "rating",
        "description",
        "status",
        "createdAt",
    ];
}

/// A stored listing together with its document id
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: String,
    pub record: ListingRecord,
}
