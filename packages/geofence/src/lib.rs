#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory geofence index for safety zone scoring.
//!
//! Holds the safety zone polygons fetched for a tracking session in an
//! R-tree and answers "what safety score applies at this point". Zones
//! may overlap; the zone that came first in the backend response wins.
//! Points outside every zone score [`NEUTRAL_SCORE`].

use std::sync::{Arc, PoisonError, RwLock};

use geo::{BoundingRect, Contains, Coord, LineString, Polygon};
use rstar::{AABB, RTree, RTreeObject};
use wayguard_zone_models::{GeoPoint, NEUTRAL_SCORE, SafetyZone};

/// One outer ring stored in the R-tree, tagged with the ordinal of the
/// zone it belongs to.
struct RingEntry {
    ordinal: usize,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for RingEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// The zone that matched a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMatch {
    /// Backend zone identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Zone category.
    pub zone_type: String,
    /// Safety score of the zone.
    pub safety_score: i32,
}

/// Outcome of [`GeofenceIndex::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Zones with at least one usable ring.
    pub indexed: usize,
    /// Zones dropped because none of their rings were usable.
    pub skipped: usize,
}

/// An immutable snapshot of the loaded zones.
struct ZoneSet {
    rings: RTree<RingEntry>,
    zones: Vec<ZoneMatch>,
}

/// Thread-safe geofence index.
///
/// [`load`](Self::load) builds a complete new snapshot before swapping it
/// in, so readers observe either the previous zone set or the new one.
#[derive(Default)]
pub struct GeofenceIndex {
    current: RwLock<Option<Arc<ZoneSet>>>,
}

impl GeofenceIndex {
    /// Creates an empty, unloaded index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held zone set with `zones`.
    ///
    /// Zones whose geometry has no usable outer ring (fewer than three
    /// distinct vertices, non-finite coordinates, or a non-polygon
    /// geometry type) are skipped.
    pub fn load(&self, zones: &[SafetyZone]) -> LoadSummary {
        let mut entries = Vec::new();
        let mut kept = Vec::with_capacity(zones.len());
        let mut summary = LoadSummary::default();

        for zone in zones {
            if !zone.has_valid_score() {
                log::warn!(
                    "Zone {} has safety score {} outside [0, 100]",
                    zone.id,
                    zone.safety_score
                );
            }

            let rings = outer_rings(&zone.geometry);
            if rings.is_empty() {
                log::warn!(
                    "Skipping zone {} ({}): no usable polygon ring",
                    zone.id,
                    zone.name
                );
                summary.skipped += 1;
                continue;
            }

            let ordinal = kept.len();
            for polygon in rings {
                entries.push(RingEntry {
                    ordinal,
                    envelope: compute_envelope(&polygon),
                    polygon,
                });
            }
            kept.push(ZoneMatch {
                id: zone.id.clone(),
                name: zone.name.clone(),
                zone_type: zone.zone_type.clone(),
                safety_score: zone.safety_score,
            });
            summary.indexed += 1;
        }

        let set = Arc::new(ZoneSet {
            rings: RTree::bulk_load(entries),
            zones: kept,
        });
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(set);

        log::info!(
            "Loaded {} safety zones into geofence index ({} skipped)",
            summary.indexed,
            summary.skipped
        );
        summary
    }

    /// Whether [`load`](Self::load) has been called at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Number of indexed zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().map_or(0, |set| set.zones.len())
    }

    /// Whether the index holds no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first zone, in load order, whose outer ring strictly
    /// contains `point`.
    #[must_use]
    pub fn zone_at(&self, point: GeoPoint) -> Option<ZoneMatch> {
        if !point.latitude.is_finite() || !point.longitude.is_finite() {
            return None;
        }

        let set = self.snapshot()?;
        let lng_lat = point.lng_lat();
        let target = geo::Point::new(lng_lat[0], lng_lat[1]);
        let query_env = AABB::from_point(lng_lat);

        // The R-tree yields candidates in arbitrary order, so rank by ordinal.
        set.rings
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&target))
            .map(|entry| entry.ordinal)
            .min()
            .map(|ordinal| set.zones[ordinal].clone())
    }

    /// Safety score at `point`, or [`NEUTRAL_SCORE`] outside every zone.
    #[must_use]
    pub fn score_at(&self, point: GeoPoint) -> i32 {
        self.zone_at(point)
            .map_or(NEUTRAL_SCORE, |zone| zone.safety_score)
    }

    fn snapshot(&self) -> Option<Arc<ZoneSet>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Extracts the usable outer ring of every polygon in `geometry`.
fn outer_rings(geometry: &geojson::Geometry) -> Vec<Polygon<f64>> {
    match &geometry.value {
        geojson::Value::Polygon(rings) => rings
            .first()
            .and_then(|ring| ring_polygon(ring))
            .into_iter()
            .collect(),
        geojson::Value::MultiPolygon(polygons) => polygons
            .iter()
            .filter_map(|rings| rings.first().and_then(|ring| ring_polygon(ring)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Builds a polygon from a GeoJSON ring, or `None` if it is degenerate.
fn ring_polygon(ring: &[geojson::Position]) -> Option<Polygon<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.len());
    for position in ring {
        let (&x, &y) = (position.first()?, position.get(1)?);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let coord = Coord { x, y };
        if coords.last() != Some(&coord) {
            coords.push(coord);
        }
    }

    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }

    Some(Polygon::new(LineString::from(coords), vec![]))
}

fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: &str, score: i32, min: [f64; 2], max: [f64; 2]) -> SafetyZone {
        SafetyZone {
            id: id.to_string(),
            name: format!("zone {id}"),
            zone_type: "test".to_string(),
            safety_score: score,
            description: None,
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![min[0], min[1]],
                vec![max[0], min[1]],
                vec![max[0], max[1]],
                vec![min[0], max[1]],
                vec![min[0], min[1]],
            ]])),
        }
    }

    #[test]
    fn unloaded_index_is_neutral() {
        let index = GeofenceIndex::new();
        assert!(!index.is_loaded());
        assert_eq!(index.score_at(GeoPoint::new(28.6, 77.2)), NEUTRAL_SCORE);
    }

    #[test]
    fn point_inside_single_zone_gets_its_score() {
        let index = GeofenceIndex::new();
        index.load(&[square("cp", 25, [77.20, 28.60], [77.24, 28.64])]);

        assert!(index.is_loaded());
        assert_eq!(index.score_at(GeoPoint::new(28.62, 77.22)), 25);
    }

    #[test]
    fn point_outside_all_zones_is_neutral() {
        let index = GeofenceIndex::new();
        index.load(&[
            square("a", 25, [77.20, 28.60], [77.24, 28.64]),
            square("b", 80, [72.80, 18.90], [72.90, 19.00]),
        ]);

        assert_eq!(index.score_at(GeoPoint::new(12.97, 77.59)), NEUTRAL_SCORE);
    }

    #[test]
    fn overlapping_zones_resolve_to_first_loaded() {
        let index = GeofenceIndex::new();
        index.load(&[
            square("outer", 90, [77.0, 28.0], [78.0, 29.0]),
            square("inner", 10, [77.4, 28.4], [77.6, 28.6]),
        ]);
        assert_eq!(index.score_at(GeoPoint::new(28.5, 77.5)), 90);

        index.load(&[
            square("inner", 10, [77.4, 28.4], [77.6, 28.6]),
            square("outer", 90, [77.0, 28.0], [78.0, 29.0]),
        ]);
        assert_eq!(index.score_at(GeoPoint::new(28.5, 77.5)), 10);
        assert_eq!(index.score_at(GeoPoint::new(28.1, 77.1)), 90);
    }

    #[test]
    fn degenerate_polygons_are_skipped() {
        let line = SafetyZone {
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![77.0, 28.0],
                vec![78.0, 29.0],
                vec![77.0, 28.0],
            ]])),
            ..square("line", 5, [0.0, 0.0], [0.0, 0.0])
        };
        let empty = SafetyZone {
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![])),
            ..square("empty", 5, [0.0, 0.0], [0.0, 0.0])
        };
        let point = SafetyZone {
            geometry: geojson::Geometry::new(geojson::Value::Point(vec![77.5, 28.5])),
            ..square("point", 5, [0.0, 0.0], [0.0, 0.0])
        };

        let index = GeofenceIndex::new();
        let ok = square("ok", 65, [77.0, 28.0], [78.0, 29.0]);
        let summary = index.load(&[line, empty, point, ok]);

        assert_eq!(
            summary,
            LoadSummary {
                indexed: 1,
                skipped: 3
            }
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.score_at(GeoPoint::new(28.5, 77.5)), 65);
    }

    #[test]
    fn holes_are_ignored() {
        let mut zone = square("donut", 30, [77.0, 28.0], [78.0, 29.0]);
        if let geojson::Value::Polygon(rings) = &mut zone.geometry.value {
            rings.push(vec![
                vec![77.4, 28.4],
                vec![77.6, 28.4],
                vec![77.6, 28.6],
                vec![77.4, 28.6],
                vec![77.4, 28.4],
            ]);
        }

        let index = GeofenceIndex::new();
        index.load(&[zone]);
        assert_eq!(index.score_at(GeoPoint::new(28.5, 77.5)), 30);
    }

    #[test]
    fn multipolygon_members_all_match() {
        let zone = SafetyZone {
            geometry: geojson::Geometry::new(geojson::Value::MultiPolygon(vec![
                vec![vec![
                    vec![0.0, 0.0],
                    vec![1.0, 0.0],
                    vec![1.0, 1.0],
                    vec![0.0, 0.0],
                ]],
                vec![vec![
                    vec![10.0, 10.0],
                    vec![12.0, 10.0],
                    vec![12.0, 12.0],
                    vec![10.0, 12.0],
                    vec![10.0, 10.0],
                ]],
            ])),
            ..square("multi", 45, [0.0, 0.0], [0.0, 0.0])
        };

        let index = GeofenceIndex::new();
        index.load(&[zone]);
        assert_eq!(index.score_at(GeoPoint::new(11.0, 11.0)), 45);
        // (lng 0.8, lat 0.2) lies under the triangle's hypotenuse.
        assert_eq!(index.score_at(GeoPoint::new(0.2, 0.8)), 45);
        assert_eq!(index.score_at(GeoPoint::new(5.0, 5.0)), NEUTRAL_SCORE);
    }

    #[test]
    fn non_finite_points_are_neutral() {
        let index = GeofenceIndex::new();
        index.load(&[square("all", 5, [-180.0, -90.0], [180.0, 90.0])]);
        assert_eq!(index.score_at(GeoPoint::new(f64::NAN, 0.0)), NEUTRAL_SCORE);
        assert_eq!(index.score_at(GeoPoint::new(0.0, f64::INFINITY)), NEUTRAL_SCORE);
    }

    #[test]
    fn zone_at_reports_metadata() {
        let index = GeofenceIndex::new();
        index.load(&[square("cp", 25, [77.20, 28.60], [77.24, 28.64])]);

        let hit = index.zone_at(GeoPoint::new(28.62, 77.22)).unwrap();
        assert_eq!(hit.id, "cp");
        assert_eq!(hit.name, "zone cp");
        assert_eq!(hit.safety_score, 25);
    }

    #[test]
    fn reload_replaces_zone_set() {
        let index = GeofenceIndex::new();
        index.load(&[square("a", 20, [0.0, 0.0], [1.0, 1.0])]);
        index.load(&[square("b", 80, [5.0, 5.0], [6.0, 6.0])]);

        assert_eq!(index.len(), 1);
        assert_eq!(index.score_at(GeoPoint::new(0.5, 0.5)), NEUTRAL_SCORE);
        assert_eq!(index.score_at(GeoPoint::new(5.5, 5.5)), 80);
    }
}
