//! Offline scoring of a point against a zones file.

use std::path::Path;

use wayguard_geofence::{GeofenceIndex, ZoneMatch};
use wayguard_tracking::classifier::tier_for;
use wayguard_tracking_models::CadenceTier;
use wayguard_zone_models::{GeoPoint, SafetyZone};

/// Result of scoring one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointScore {
    /// Safety score at the point.
    pub score: i32,
    /// Cadence tier for the score.
    pub tier: CadenceTier,
    /// Zone the point fell in, if any.
    pub zone: Option<ZoneMatch>,
}

/// Reads a `GET /safety-zones` style JSON array from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a zone list.
pub fn read_zones(path: &Path) -> Result<Vec<SafetyZone>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let zones = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid zones file {}: {e}", path.display()))?;
    Ok(zones)
}

/// Scores `point` against `zones`.
pub fn score_point(zones: &[SafetyZone], point: GeoPoint) -> PointScore {
    let index = GeofenceIndex::new();
    let summary = index.load(zones);
    log::debug!(
        "Indexed {} zones ({} skipped)",
        summary.indexed,
        summary.skipped
    );

    let zone = index.zone_at(point);
    let score = index.score_at(point);
    PointScore {
        score,
        tier: tier_for(score),
        zone,
    }
}

/// Runs the `score` subcommand.
///
/// # Errors
///
/// Returns an error if the zones file cannot be loaded.
pub fn run(path: &Path, point: GeoPoint) -> Result<(), Box<dyn std::error::Error>> {
    let zones = read_zones(path)?;
    let result = score_point(&zones, point);

    match &result.zone {
        Some(zone) => println!("Inside {} ({}, {})", zone.name, zone.id, zone.zone_type),
        None => println!("Outside every zone"),
    }
    println!(
        "Score {} -> {} (sample every {}s)",
        result.score,
        result.tier,
        result.tier.interval().as_secs()
    );
    Ok(())
}
