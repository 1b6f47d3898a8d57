//! Device position seam.
//!
//! The platform geolocation API is single-shot: each call asks for one
//! fix. [`FixedPosition`] and [`RoutePositions`] are simple sources for
//! hosts without a real device (simulators, the CLI).

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use wayguard_zone_models::GeoPoint;

use crate::GeolocationError;

/// Hints passed with each position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask the platform for a GPS-grade fix.
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
        }
    }
}

/// Single-shot "get current position".
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Requests the current position.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if permission is denied or no fix is
    /// available.
    async fn current_position(&self, options: PositionOptions)
    -> Result<GeoPoint, GeolocationError>;
}

/// Always reports the same point.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub GeoPoint);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<GeoPoint, GeolocationError> {
        Ok(self.0)
    }
}

/// Walks a recorded route, one point per request, wrapping around at
/// the end.
#[derive(Debug)]
pub struct RoutePositions {
    points: Vec<GeoPoint>,
    next: AtomicUsize,
}

impl RoutePositions {
    /// Creates a route source. An empty route reports
    /// [`GeolocationError::Unavailable`].
    #[must_use]
    pub const fn new(points: Vec<GeoPoint>) -> Self {
        Self {
            points,
            next: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PositionSource for RoutePositions {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<GeoPoint, GeolocationError> {
        if self.points.is_empty() {
            return Err(GeolocationError::Unavailable {
                message: "route has no points".to_string(),
            });
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.points.len();
        Ok(self.points[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn route_wraps_around() {
        let a = GeoPoint::new(28.61, 77.20);
        let b = GeoPoint::new(28.62, 77.21);
        let route = RoutePositions::new(vec![a, b]);
        let opts = PositionOptions::default();

        assert_eq!(route.current_position(opts).await.unwrap(), a);
        assert_eq!(route.current_position(opts).await.unwrap(), b);
        assert_eq!(route.current_position(opts).await.unwrap(), a);
    }

    #[tokio::test]
    async fn empty_route_is_unavailable() {
        let route = RoutePositions::new(vec![]);
        assert!(matches!(
            route.current_position(PositionOptions::default()).await,
            Err(GeolocationError::Unavailable { .. })
        ));
    }
}
