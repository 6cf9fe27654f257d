use serde::{Deserialize, Serialize};

/// A downloaded listing photo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Original provider URL.
    pub url: String,
    /// Stable relative path the file is served from (e.g. `/images/123_0.jpg`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub local_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caption: String,
}

/// A listing in the internal schema, ready to be persisted.
///
/// Optional attributes are `None` when the provider did not supply them;
/// a zero or empty provider value never reaches this type as `Some`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportedListing {
    pub name: String,
    pub location: String,
    pub price: f64,
    pub description: Option<String>,
    pub photos: Vec<MediaAsset>,
    pub external_id: Option<String>,
    pub mls_number: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub square_feet: Option<i32>,
    pub lot_size: Option<String>,
    pub year_built: Option<i32>,
}
