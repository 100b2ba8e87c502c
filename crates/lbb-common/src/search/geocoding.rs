//! Zipcode to coordinates lookup.
//!
//! The table is a JSON array:
//!
//! ```json
//! [{ "name": "Paris 10e Arrondissement", "zipcode": "75010", "latitude": 48.876, "longitude": 2.361 }]
//! ```

use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use thiserror::Error;

use super::filters::GeoPoint;

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("failed to read zipcode table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse zipcode table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolves a zipcode to the coordinates searches start from.
pub trait Geocoder: Send + Sync {
    fn coordinates_for(&self, zipcode: &str) -> Option<GeoPoint>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZipcodeEntry {
    pub name: String,
    pub zipcode: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ZipcodeGeocoder {
    entries: HashMap<String, ZipcodeEntry>,
}

impl ZipcodeGeocoder {
    /// Later entries for the same zipcode replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = ZipcodeEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.zipcode.trim().to_string(), entry))
                .collect(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, GeocodingError> {
        let entries: Vec<ZipcodeEntry> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GeocodingError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn city_name(&self, zipcode: &str) -> Option<&str> {
        self.entries.get(zipcode.trim()).map(|e| e.name.as_str())
    }
}

impl Geocoder for ZipcodeGeocoder {
    fn coordinates_for(&self, zipcode: &str) -> Option<GeoPoint> {
        self.entries
            .get(zipcode.trim())
            .map(|entry| GeoPoint::new(entry.latitude, entry.longitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"[
        { "name": "Paris 10e Arrondissement", "zipcode": "75010", "latitude": 48.876, "longitude": 2.361 },
        { "name": "Metz", "zipcode": "57000", "latitude": 49.11, "longitude": 6.17 }
    ]"#;

    #[test]
    fn resolves_known_zipcodes() {
        let geocoder = ZipcodeGeocoder::from_json_str(TABLE).unwrap();

        assert_eq!(geocoder.len(), 2);
        assert_eq!(
            geocoder.coordinates_for(" 75010 "),
            Some(GeoPoint::new(48.876, 2.361))
        );
        assert_eq!(geocoder.city_name("57000"), Some("Metz"));
        assert_eq!(geocoder.coordinates_for("99999"), None);
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert!(matches!(
            ZipcodeGeocoder::from_json_str("{\"75010\": []}"),
            Err(GeocodingError::Parse(_))
        ));
    }
}
