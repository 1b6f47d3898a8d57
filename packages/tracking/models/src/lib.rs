#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trip, cadence tier, and check-in types.
//!
//! These mirror the backend's trip and user records and the small amount
//! of client-side state (cadence tier, check-in countdown, location
//! samples) the tracking engine publishes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use wayguard_zone_models::GeoPoint;

/// Sampling cadence bucket chosen from the current safety score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CadenceTier {
    /// Risky surroundings: sample every 15 seconds.
    HighAlert,
    /// Moderate surroundings: sample every minute.
    Caution,
    /// Safe surroundings: sample every five minutes.
    LowPower,
}

impl CadenceTier {
    /// Sampling interval for this tier in milliseconds.
    #[must_use]
    pub const fn interval_ms(self) -> u64 {
        match self {
            Self::HighAlert => 15_000,
            Self::Caution => 60_000,
            Self::LowPower => 300_000,
        }
    }

    /// Sampling interval for this tier.
    #[must_use]
    pub const fn interval(self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Returns all variants, riskiest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::HighAlert, Self::Caution, Self::LowPower]
    }
}

/// Status of a trip record. Owned by the backend; the client only
/// requests transitions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    /// Tracking normally.
    Active,
    /// Paused by the user until `pausedUntil`.
    Paused,
    /// The server asked "are you okay?" and is waiting for a reply.
    CheckIn,
    /// The user confirmed they are safe; anomaly detection is snoozed.
    Snoozed,
    /// The trip ran past its end date.
    Expired,
    /// The trip was cancelled.
    Cancelled,
}

impl TripStatus {
    /// Whether a trip in this status can be the session's active trip.
    #[must_use]
    pub const fn is_trackable(self) -> bool {
        matches!(
            self,
            Self::Active | Self::Paused | Self::CheckIn | Self::Snoozed
        )
    }
}

/// A trip record as embedded in the user payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Trip identifier.
    pub id: String,
    /// Current status.
    pub status: TripStatus,
    /// End of the current pause, when `status` is `PAUSED`.
    #[serde(default)]
    pub paused_until: Option<DateTime<Utc>>,
    /// When the current check-in started, when `status` is `CHECK_IN`.
    #[serde(default)]
    pub check_in_started_at: Option<DateTime<Utc>>,
    /// End of the current snooze, when `status` is `SNOOZED`.
    #[serde(default)]
    pub snoozed_until: Option<DateTime<Utc>>,
}

impl Trip {
    /// Creates an active trip with no timestamps set.
    #[must_use]
    pub fn active(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TripStatus::Active,
            paused_until: None,
            check_in_started_at: None,
            snoozed_until: None,
        }
    }
}

/// Account role.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// A traveller; the only role that is tracked.
    Tourist,
    /// Console administrator.
    Admin,
    /// Registered business.
    Business,
}

/// The authenticated user with their trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone_number: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Account role.
    pub role: UserRole,
    /// All trips of this user, in backend order.
    #[serde(default)]
    pub trips: Vec<Trip>,
}

/// Response body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The logged-in user.
    pub user: User,
}

/// Events pushed by the server over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum TripEvent {
    /// The server detected an anomaly and asks the user to confirm they
    /// are safe.
    #[serde(rename = "ARE_YOU_OKAY")]
    CheckInRequested {
        /// Optional human-readable reason.
        #[serde(default)]
        message: Option<String>,
    },
}

/// Check-in countdown state as shown by the check-in prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownState {
    /// Seconds left before the prompt closes.
    pub remaining_seconds: u32,
    /// Whether the countdown is ticking.
    pub running: bool,
    /// Whether the prompt is visible.
    pub visible: bool,
}

/// One position sample handed to the location reporter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    /// Sampled position.
    pub point: GeoPoint,
    /// Safety score at `point`.
    pub score: i32,
    /// Cadence tier derived from `score`.
    pub tier: CadenceTier,
    /// Monotonic per-session sample number.
    pub sequence: u64,
    /// When the sample was taken.
    pub sampled_at: DateTime<Utc>,
}
