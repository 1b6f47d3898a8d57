//! Location reporting seam.
//!
//! Reporting is best effort: there is no retry queue and no local
//! buffering. A failed report is lost and superseded by the next sample.

use async_trait::async_trait;
use wayguard_tracking_models::LocationSample;

use crate::NetworkError;

/// Pushes sampled positions to the trip-tracking endpoint.
#[async_trait]
pub trait LocationReporter: Send + Sync {
    /// Reports one sample.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the sample could not be delivered.
    async fn report(&self, sample: &LocationSample) -> Result<(), NetworkError>;
}
