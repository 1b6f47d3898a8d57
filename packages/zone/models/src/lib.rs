#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Safety zone and coordinate types.
//!
//! A safety zone is a polygon drawn by an administrator with a numeric
//! safety score attached. Zones are fetched once per tracking session
//! from `GET /safety-zones` and are immutable afterwards.

use serde::{Deserialize, Serialize};

/// Score reported for a point that falls inside no zone.
pub const NEUTRAL_SCORE: i32 = 50;

/// Lowest valid zone safety score.
pub const MIN_SAFETY_SCORE: i32 = 0;

/// Highest valid zone safety score.
pub const MAX_SAFETY_SCORE: i32 = 100;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns the point as `[lng, lat]`, the order polygon rings use.
    #[must_use]
    pub const fn lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// A safety zone as returned by `GET /safety-zones`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyZone {
    /// Backend zone identifier.
    pub id: String,
    /// Display name (e.g. "Connaught Place").
    pub name: String,
    /// Free-form zone category set by the zone editor.
    #[serde(rename = "type")]
    pub zone_type: String,
    /// Safety score in `[0, 100]`; lower is riskier.
    pub safety_score: i32,
    /// Optional editor description.
    #[serde(default)]
    pub description: Option<String>,
    /// Zone boundary. Only the outer ring of each polygon is used.
    pub geometry: geojson::Geometry,
}

impl SafetyZone {
    /// Whether the score lies inside `[0, 100]`.
    #[must_use]
    pub const fn has_valid_score(&self) -> bool {
        self.safety_score >= MIN_SAFETY_SCORE && self.safety_score <= MAX_SAFETY_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_zone() {
        let body = serde_json::json!({
            "id": "z-1",
            "name": "Paharganj",
            "type": "market",
            "safetyScore": 35,
            "description": "Crowded after dark",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[77.20, 28.64], [77.22, 28.64], [77.22, 28.65], [77.20, 28.64]]]
            }
        });

        let zone: SafetyZone = serde_json::from_value(body).unwrap();
        assert_eq!(zone.id, "z-1");
        assert_eq!(zone.zone_type, "market");
        assert_eq!(zone.safety_score, 35);
        assert!(zone.has_valid_score());
        assert!(matches!(zone.geometry.value, geojson::Value::Polygon(_)));
    }

    #[test]
    fn description_is_optional() {
        let body = serde_json::json!({
            "id": "z-2",
            "name": "Lodhi Garden",
            "type": "park",
            "safetyScore": 90,
            "geometry": { "type": "Polygon", "coordinates": [] }
        });

        let zone: SafetyZone = serde_json::from_value(body).unwrap();
        assert!(zone.description.is_none());
    }

    #[test]
    fn out_of_range_score_is_flagged() {
        let zone = SafetyZone {
            id: "z-3".to_string(),
            name: "Bad".to_string(),
            zone_type: String::new(),
            safety_score: 120,
            description: None,
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![])),
        };
        assert!(!zone.has_valid_score());
    }

    #[test]
    fn lng_lat_order() {
        let p = GeoPoint::new(28.61, 77.20);
        assert_eq!(p.lng_lat(), [77.20, 28.61]);
    }
}
