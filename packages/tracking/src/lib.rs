#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Adaptive location tracking engine.
//!
//! Samples the device position on a self-adjusting timer, scores each
//! sample against the loaded safety zones, and speeds up or slows down
//! sampling depending on how risky the surroundings are:
//!
//! | Safety score | Tier         | Interval |
//! |--------------|--------------|----------|
//! | `< 40`       | `HIGH_ALERT` | 15 s     |
//! | `40..70`     | `CAUTION`    | 60 s     |
//! | `>= 70`      | `LOW_POWER`  | 5 min    |
//!
//! The [`lifecycle::TripLifecycleController`] gates sampling on the
//! active trip's status (pause/resume, server check-in pings, snooze)
//! and drives the [`countdown::CheckInCountdown`] shown while a check-in
//! is pending. [`tracker::Tracker`] wires everything together for a host.
//!
//! All network, device, and UI collaborators are reached through the
//! traits in [`backend`], [`position`], [`reporter`], [`notify`], and
//! [`clock`].

pub mod backend;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod lifecycle;
pub mod notify;
pub mod position;
pub mod reporter;
pub mod scheduler;
pub mod session;
pub mod tracker;

#[cfg(test)]
mod testing;

use thiserror::Error;
use wayguard_tracking_models::TripStatus;

/// A failed call to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NetworkError {
    /// Human-readable failure, preferably the server's own message.
    pub message: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
}

impl NetworkError {
    /// Creates an error without an HTTP status.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }
}

/// A failed device position request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user denied location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The platform could not produce a fix.
    #[error("Position unavailable: {message}")]
    Unavailable {
        /// Platform-provided reason.
        message: String,
    },

    /// No fix arrived within the configured timeout.
    #[error("Position request timed out")]
    Timeout,
}

/// Why tracking cannot start yet. Not a user-facing error: the host is
/// expected to re-evaluate once the dependency becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreconditionNotMet {
    /// The persisted session has not been restored yet.
    #[error("session not hydrated")]
    NotHydrated,
    /// No authenticated user.
    #[error("no authenticated user")]
    NoUser,
    /// The session has no active trip id.
    #[error("no active trip")]
    NoActiveTrip,
    /// The active trip id does not match any of the user's trips.
    #[error("active trip not found in user's trips")]
    ActiveTripMissing,
    /// Safety zones have not been loaded.
    #[error("safety zones not loaded")]
    ZonesNotLoaded,
}

/// Errors returned from user-initiated tracking actions.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The backend rejected or failed the request.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The action is not allowed in the trip's current status.
    #[error("Cannot {action} a trip in status {status}")]
    InvalidTransition {
        /// Current trip status.
        status: TripStatus,
        /// Requested action.
        action: &'static str,
    },

    /// A pause duration that is not a positive number of hours.
    #[error("Invalid pause duration: {hours} hours")]
    InvalidDuration {
        /// The rejected duration.
        hours: f64,
    },

    /// Tracking is not ready.
    #[error("Tracking not ready: {0}")]
    Precondition(#[from] PreconditionNotMet),

    /// Configuration could not be read or parsed.
    #[error("Config error: {message}")]
    Config {
        /// Description of the failure.
        message: String,
    },
}
