//! Database schema for imported listings.

/// SQL schema for the listings database.
pub const LISTINGS_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    price REAL NOT NULL,
    description TEXT,

    -- JSON array of {url, local_url, caption}
    photos TEXT NOT NULL DEFAULT '[]',

    -- Provider identifiers
    external_id TEXT,
    mls_number TEXT,

    -- Property details
    property_type TEXT,
    bedrooms INTEGER,
    bathrooms INTEGER,
    square_feet INTEGER,
    lot_size TEXT,
    year_built INTEGER,

    created_at INTEGER NOT NULL DEFAULT (cast(strftime('%s','now') as int))
);

CREATE INDEX IF NOT EXISTS idx_listings_external_id ON listings(external_id);
"#;
