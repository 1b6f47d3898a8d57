//! Backend seams for zone loading and trip status transitions.

use async_trait::async_trait;
use wayguard_zone_models::SafetyZone;

use crate::NetworkError;

/// Source of the safety zone set (`GET /safety-zones`).
#[async_trait]
pub trait ZoneSource: Send + Sync {
    /// Fetches every safety zone, in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the request fails.
    async fn fetch_zones(&self) -> Result<Vec<SafetyZone>, NetworkError>;
}

/// Trip status transitions requested by the client.
///
/// Each call only asks the backend to change the server-side record; the
/// caller mirrors the change locally on success.
#[async_trait]
pub trait TripActions: Send + Sync {
    /// `POST /trips/pause {durationInHours}`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the request fails.
    async fn pause(&self, duration_hours: f64) -> Result<(), NetworkError>;

    /// `POST /trips/resume`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the request fails.
    async fn resume(&self) -> Result<(), NetworkError>;

    /// `POST /trips/snooze`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the request fails.
    async fn snooze(&self) -> Result<(), NetworkError>;
}
