pub mod draft;
pub mod grid;
pub mod payload;

pub use draft::{DraftField, ListingDraft};
pub use grid::AvailabilityGrid;
pub use payload::{build_payload, Carry};

use crate::models::UnknownVariant;

/// Validation failures raised while editing or normalising a draft
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unit {unit} is outside 1..={total}")]
    UnitOutOfRange { unit: u32, total: u32 },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),
}

impl FormError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FormError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Split comma-separated input into trimmed, non-empty entries
pub fn parse_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
