//! Data models for discovered spots and their persisted representation.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SpotCandidate`]: A spot extracted from one page, not yet verified
//! - [`Coordinates`]: A resolved latitude/longitude pair
//! - [`SpotRecord`]: The flat row written to the destination table
//! - [`ExistingSpot`]: The `name, country` projection read back when seeding

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A kitesurfing spot as extracted from a source page.
///
/// Candidates are created by a parser, get their coordinates filled in once
/// by the geocoding step, and are then either dropped or persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotCandidate {
    /// Spot name as it appears on the page.
    pub name: String,
    /// Country, or an empty string when the markup does not say.
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    /// Skill level, only some sources publish it.
    pub difficulty: Option<String>,
    /// Month tokens in page order, e.g. `["June", "July"]`.
    pub best_months: Option<Vec<String>>,
    /// Identifier of the source the candidate came from.
    pub source: String,
    /// The fetched page URL.
    pub source_url: String,
    pub metadata: Map<String, Value>,
}

impl SpotCandidate {
    /// Create a bare candidate with only the required fields set.
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        source: &str,
        source_url: &str,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            latitude: None,
            longitude: None,
            description: None,
            difficulty: None,
            best_months: None,
            source: source.to_string(),
            source_url: source_url.to_string(),
            metadata: Map::new(),
        }
    }

    /// Coordinates, when both halves are known.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    pub fn set_coordinates(&mut self, coords: Coordinates) {
        self.latitude = Some(coords.latitude);
        self.longitude = Some(coords.longitude);
    }

    /// Free-text query sent to the geocoding service for this spot.
    ///
    /// ```ignore
    /// assert_eq!(tarifa.geocode_query(), "Tarifa, Spain kitesurfing spot");
    /// ```
    pub fn geocode_query(&self) -> String {
        let name = self.name.trim();
        let country = self.country.trim();
        if country.is_empty() {
            format!("{name} kitesurfing spot")
        } else {
            format!("{name}, {country} kitesurfing spot")
        }
    }
}

/// The flat row inserted into the spots table.
///
/// `best_months` is stored as a JSON-encoded list (`["June","July"]`) and the
/// column is left out entirely when the candidate has no months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_months: Option<String>,
    pub source: String,
    pub source_url: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SpotRecord {
    /// Flatten a candidate into the row shape the table expects.
    pub fn from_candidate(candidate: &SpotCandidate) -> Result<Self, serde_json::Error> {
        let best_months = candidate
            .best_months
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        Ok(Self {
            name: candidate.name.clone(),
            country: candidate.country.clone(),
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            description: candidate.description.clone(),
            difficulty: candidate.difficulty.clone(),
            best_months,
            source: candidate.source.clone(),
            source_url: candidate.source_url.clone(),
            metadata: candidate.metadata.clone(),
        })
    }
}

/// Projection of an already stored spot used to seed the duplicate filter.
#[derive(Debug, Clone, Deserialize)]
pub struct ExistingSpot {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> SpotCandidate {
        SpotCandidate::new("Tarifa", "Spain", "kiteforum", "https://example.com/spots")
    }

    #[test]
    fn test_geocode_query_with_country() {
        assert_eq!(candidate().geocode_query(), "Tarifa, Spain kitesurfing spot");
    }

    #[test]
    fn test_geocode_query_without_country() {
        let spot = SpotCandidate::new("Le Morne", "", "kiteforum", "https://example.com");
        assert_eq!(spot.geocode_query(), "Le Morne kitesurfing spot");
    }

    #[test]
    fn test_coordinates_require_both_halves() {
        let mut spot = candidate();
        spot.latitude = Some(36.0);
        assert_eq!(spot.coordinates(), None);

        spot.set_coordinates(Coordinates {
            latitude: 36.0128,
            longitude: -5.6012,
        });
        assert_eq!(
            spot.coordinates(),
            Some(Coordinates {
                latitude: 36.0128,
                longitude: -5.6012
            })
        );
    }

    #[test]
    fn test_best_months_are_encoded_as_text_list() {
        let mut spot = candidate();
        spot.best_months = Some(vec!["June".to_string(), "July".to_string()]);

        let record = SpotRecord::from_candidate(&spot).unwrap();
        assert_eq!(record.best_months.as_deref(), Some(r#"["June","July"]"#));
        let decoded: Vec<String> =
            serde_json::from_str(record.best_months.as_deref().unwrap()).unwrap();
        assert_eq!(decoded, vec!["June".to_string(), "July".to_string()]);
    }

    #[test]
    fn test_missing_best_months_are_omitted_from_row() {
        let record = SpotRecord::from_candidate(&candidate()).unwrap();
        assert_eq!(record.best_months, None);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("best_months").is_none());
        assert!(json.get("latitude").is_none());
        assert_eq!(json["name"], "Tarifa");
        assert_eq!(json["metadata"], serde_json::json!({}));
    }

    #[test]
    fn test_existing_spot_accepts_null_country() {
        let rows: Vec<ExistingSpot> =
            serde_json::from_str(r#"[{"name":"Dakhla","country":null},{"name":"Tarifa"}]"#)
                .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].country.is_none());
        assert!(rows[1].country.is_none());
    }
}
