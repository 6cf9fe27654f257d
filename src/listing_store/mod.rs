//! Persistence of imported listings.

mod converter;
mod models;
mod schema;
mod store;

pub use converter::convert_listing;
pub use models::{ImportedListing, MediaAsset};
pub use schema::LISTINGS_SCHEMA_SQL;
pub use store::{ListingStore, SqliteListingStore};
