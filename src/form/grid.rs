use std::collections::BTreeSet;

use super::FormError;

/// Room availability grid for a multi-unit listing.
///
/// Units are numbered `1..=total_units`. The available count is always the
/// size of the available set, so there is no separate counter to drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityGrid {
    total_units: u32,
    available: BTreeSet<u32>,
}

impl Default for AvailabilityGrid {
    fn default() -> Self {
        Self {
            total_units: 1,
            available: BTreeSet::new(),
        }
    }
}

impl AvailabilityGrid {
    /// Build a grid from stored values, dropping any unit outside `1..=total_units`
    pub fn new(total_units: u32, available: impl IntoIterator<Item = u32>) -> Self {
        let total_units = total_units.max(1);
        Self {
            total_units,
            available: available
                .into_iter()
                .filter(|n| (1..=total_units).contains(n))
                .collect(),
        }
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn available_units(&self) -> u32 {
        self.available.len() as u32
    }

    /// Available unit numbers in ascending order
    pub fn available_room_numbers(&self) -> Vec<u32> {
        self.available.iter().copied().collect()
    }

    pub fn is_available(&self, unit: u32) -> bool {
        self.available.contains(&unit)
    }

    /// Flip one unit between available and booked. Returns whether it is now available.
    pub fn toggle(&mut self, unit: u32) -> Result<bool, FormError> {
        if !(1..=self.total_units).contains(&unit) {
            return Err(FormError::UnitOutOfRange {
                unit,
                total: self.total_units,
            });
        }

        if self.available.remove(&unit) {
            Ok(false)
        } else {
            self.available.insert(unit);
            Ok(true)
        }
    }

    /// Change the unit count. Units beyond the new total are no longer available.
    pub fn resize(&mut self, total_units: u32) -> Result<(), FormError> {
        if total_units == 0 {
            return Err(FormError::invalid("total_units", "must be at least 1"));
        }
        self.total_units = total_units;
        self.available.retain(|&n| n <= total_units);
        Ok(())
    }
}
