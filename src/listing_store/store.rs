//! SQLite store for imported listings.

use super::models::{ImportedListing, MediaAsset};
use super::schema::LISTINGS_SCHEMA_SQL;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Trait for listing storage operations.
///
/// Calls are blocking; async callers should go through `spawn_blocking`.
pub trait ListingStore: Send + Sync {
    /// Insert a new listing, returning its row id.
    fn create_listing(&self, listing: &ImportedListing) -> Result<i64>;

    /// Get the most recently created listing with the given provider id.
    fn get_by_external_id(&self, external_id: &str) -> Result<Option<ImportedListing>>;

    /// Number of stored listings.
    fn count(&self) -> Result<usize>;
}

/// SQLite implementation of ListingStore.
pub struct SqliteListingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteListingStore {
    /// Open or create a listings database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open listings database: {:?}", path))?;
        conn.execute_batch(LISTINGS_SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(LISTINGS_SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("listings database lock poisoned"))
    }

    fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<ImportedListing> {
        let photos_json: String = row.get("photos")?;
        let photos: Vec<MediaAsset> = serde_json::from_str(&photos_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(ImportedListing {
            name: row.get("name")?,
            location: row.get("location")?,
            price: row.get("price")?,
            description: row.get("description")?,
            photos,
            external_id: row.get("external_id")?,
            mls_number: row.get("mls_number")?,
            property_type: row.get("property_type")?,
            bedrooms: row.get("bedrooms")?,
            bathrooms: row.get("bathrooms")?,
            square_feet: row.get("square_feet")?,
            lot_size: row.get("lot_size")?,
            year_built: row.get("year_built")?,
        })
    }
}

impl ListingStore for SqliteListingStore {
    fn create_listing(&self, listing: &ImportedListing) -> Result<i64> {
        let photos =
            serde_json::to_string(&listing.photos).context("Failed to encode listing photos")?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO listings (
                name, location, price, description, photos,
                external_id, mls_number, property_type,
                bedrooms, bathrooms, square_feet, lot_size, year_built
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                listing.name,
                listing.location,
                listing.price,
                listing.description,
                photos,
                listing.external_id,
                listing.mls_number,
                listing.property_type,
                listing.bedrooms,
                listing.bathrooms,
                listing.square_feet,
                listing.lot_size,
                listing.year_built,
            ],
        )
        .context("Failed to insert listing")?;

        Ok(conn.last_insert_rowid())
    }

    fn get_by_external_id(&self, external_id: &str) -> Result<Option<ImportedListing>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM listings WHERE external_id = ?1 ORDER BY id DESC LIMIT 1",
            params![external_id],
            Self::row_to_listing,
        )
        .optional()
        .context("Failed to query listing")
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
