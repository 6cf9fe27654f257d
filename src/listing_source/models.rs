//! Models for the listing provider API responses.
//!
//! These types match the JSON returned by the provider's `/properties`
//! endpoint. Fields the provider omits fall back to empty values so that a
//! sparse record still decodes.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// =============================================================================
// Wire helpers
// =============================================================================

/// A string field that the provider sometimes sends as a JSON number.
///
/// Strings are kept as-is, numbers use their JSON text, `null` becomes "".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlexibleString(String);

impl FlexibleString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FlexibleString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for FlexibleString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FlexibleString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::String(s) => Ok(Self(s)),
            JsonValue::Number(n) => Ok(Self(n.to_string())),
            JsonValue::Null => Ok(Self::default()),
            other => Err(de::Error::custom(format!(
                "cannot read {} as a string",
                other
            ))),
        }
    }
}

/// Deserialize an optional JSON value, mapping `null` to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Listing records
// =============================================================================

/// Listing record as returned by the provider.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalListing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub listing_id: String,
    #[serde(default, rename = "mlsId")]
    pub mls_number: FlexibleString,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: ExternalAddress,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub property: ExternalPropertyDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remarks: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAddress {
    #[serde(default, deserialize_with = "null_as_default")]
    pub full: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(default)]
    pub street_number: FlexibleString,
    #[serde(default, deserialize_with = "null_as_default")]
    pub street_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub postal_code: String,
}

/// Physical attributes of a listing. Zero means "not provided".
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPropertyDetails {
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub property_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub year_built: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stories: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub area: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lot_size: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bedrooms: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bathrooms: i64,
}
