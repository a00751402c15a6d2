//! Read-side number handling for stored listings.
//!
//! Older documents can hold values the current form would refuse (NaN
//! prices, negative counts, fractional capacities). Those read back as the
//! field's default so the listing stays visible and editable.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn whole(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    finite(value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32)
}

pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(finite(&value).filter(|n| *n >= 0.0).unwrap_or(0.0))
}

pub fn optional_amount<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(finite(&value).filter(|n| *n >= 0.0))
}

pub fn rating_average<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(finite(&value)
        .filter(|n| (0.0..=5.0).contains(n))
        .unwrap_or(4.5))
}

pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(whole(&value).unwrap_or(0))
}

pub fn at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(whole(&value).filter(|n| *n >= 1).unwrap_or(1))
}

pub fn optional_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(whole(&value))
}

/// Unit numbers, dropping entries that aren't positive whole numbers
pub fn unit_numbers<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<u32>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|items| {
        items
            .iter()
            .filter_map(whole)
            .filter(|n| *n >= 1)
            .collect()
    }))
}
