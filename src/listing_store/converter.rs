//! Mapping from provider records to the internal listing schema.

use super::models::{ImportedListing, MediaAsset};
use crate::listing_source::ExternalListing;

/// Empty provider strings mean "not provided".
fn optional_text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Zero provider counts mean "not provided". Values outside `i32` are dropped.
fn optional_count(value: i64) -> Option<i32> {
    if value == 0 {
        None
    } else {
        i32::try_from(value).ok()
    }
}

/// Convert a provider listing and its downloaded photos to an `ImportedListing`.
pub fn convert_listing(listing: &ExternalListing, photos: Vec<MediaAsset>) -> ImportedListing {
    let address = &listing.address;
    let name = format!("{} {}", address.street_number, address.street_name)
        .trim()
        .to_string();

    ImportedListing {
        name,
        location: address.full.clone(),
        price: listing.list_price,
        description: optional_text(&listing.remarks),
        photos,
        external_id: optional_text(&listing.listing_id),
        mls_number: optional_text(listing.mls_number.as_str()),
        property_type: optional_text(&listing.property.property_type),
        bedrooms: optional_count(listing.property.bedrooms),
        bathrooms: optional_count(listing.property.bathrooms),
        square_feet: optional_count(listing.property.area),
        lot_size: optional_text(&listing.property.lot_size),
        year_built: optional_count(listing.property.year_built),
    }
}
