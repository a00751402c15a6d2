use std::fmt::Write;

use crate::form::{AvailabilityGrid, ListingDraft};
use crate::models::{Listing, ListingStatus};

/// Inventory listing, one card per line block
pub fn render_inventory(listings: &[Listing]) -> String {
    let mut out = format!("Property Inventory ({} units)\n", listings.len());
    if listings.is_empty() {
        out.push_str("  No listings yet. Use `add` to create one.\n");
    }
    for listing in listings {
        out.push_str(&render_card(listing));
    }
    out
}

pub fn render_card(listing: &Listing) -> String {
    let record = &listing.record;
    let badge = match record.status {
        ListingStatus::Available => "Live",
        ListingStatus::Booked => "Sold Out",
    };

    let mut line = format!(
        "  [{}] {} ({})\n      {} | ₹{} | {} | ★ {:.1}",
        badge,
        record.info.title,
        listing.id,
        record.info.location,
        record.price.amount,
        record.rules.tenant_type,
        record.rating.average,
    );
    if let Some((available, total)) = record.rules.availability() {
        let _ = write!(line, " | rooms {}/{}", available, total);
    }
    line.push('\n');
    line
}

/// Row of unit numbers; available units are bracketed
pub fn render_grid(grid: &AvailabilityGrid) -> String {
    (1..=grid.total_units())
        .map(|unit| {
            if grid.is_available(unit) {
                format!("[{}]", unit)
            } else {
                format!(" {} ", unit)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_draft(draft: &ListingDraft) -> String {
    let mut out = String::new();
    let heading = if draft.is_editing() {
        "Edit Property Details"
    } else {
        "Add New Property"
    };
    let _ = writeln!(out, "{}", heading);
    let _ = writeln!(out, "  title:        {}", draft.title);
    let _ = writeln!(out, "  type:         {}", draft.property_type);
    let _ = writeln!(out, "  location:     {}", draft.location);
    let _ = writeln!(out, "  address:      {}", draft.postal_address);
    let _ = writeln!(out, "  maps:         {}", draft.google_maps_link);
    let _ = writeln!(out, "  price:        {}", draft.price);
    let _ = writeln!(out, "  market_price: {}", draft.market_price);
    let _ = writeln!(out, "  rating:       {} ({} reviews)", draft.rating, draft.rating_count);
    let _ = writeln!(out, "  tenant_type:  {}", draft.tenant_type);
    let _ = writeln!(out, "  capacity:     {}", draft.capacity);
    let _ = writeln!(out, "  amenities:    {}", draft.amenities);
    let _ = writeln!(out, "  restrictions: {}", draft.restrictions);
    let _ = writeln!(out, "  phone:        {}", draft.phone);
    let _ = writeln!(out, "  description:  {}", draft.description);
    let _ = writeln!(
        out,
        "  thumbnail:    {}",
        if draft.thumbnail.is_empty() { "(none)" } else { draft.thumbnail.as_str() }
    );
    let _ = writeln!(out, "  gallery ({}):", draft.gallery().len());
    for (index, url) in draft.gallery().iter().enumerate() {
        let _ = writeln!(out, "    {}: {}", index, url);
    }

    let grid = draft.grid();
    let _ = writeln!(
        out,
        "  rooms: {} available of {}",
        grid.available_units(),
        grid.total_units()
    );
    if grid.total_units() > 1 {
        let _ = writeln!(out, "    {}", render_grid(grid));
    }
    out
}
