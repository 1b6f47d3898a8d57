//! Authenticated session state.
//!
//! Holds the bearer token, the user record (with its trips), and the id
//! of the session's single active trip. The active trip is chosen once,
//! at login: the first trip whose status is trackable.

use serde::{Deserialize, Serialize};
use wayguard_tracking_models::{AuthResponse, Trip, User};

use crate::PreconditionNotMet;

/// Session record owned by the tracking host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Whether persisted state has been restored. Never persisted itself.
    #[serde(skip)]
    pub hydrated: bool,
    /// Bearer token.
    pub token: Option<String>,
    /// Authenticated user.
    pub user: Option<User>,
    /// Id of the active trip.
    pub trip_id: Option<String>,
}

impl Session {
    /// Creates a hydrated session from a login response.
    #[must_use]
    pub fn from_auth(auth: AuthResponse) -> Self {
        let mut session = Self {
            hydrated: true,
            ..Self::default()
        };
        session.login(auth.token, auth.user);
        session
    }

    /// Stores credentials and selects the active trip.
    pub fn login(&mut self, token: String, user: User) {
        self.trip_id = user
            .trips
            .iter()
            .find(|trip| trip.status.is_trackable())
            .map(|trip| trip.id.clone());
        self.token = Some(token);
        self.user = Some(user);
    }

    /// Clears credentials, user, and active trip.
    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
        self.trip_id = None;
    }

    /// The active trip, if one is selected and present.
    #[must_use]
    pub fn active_trip(&self) -> Option<&Trip> {
        let trip_id = self.trip_id.as_deref()?;
        self.user
            .as_ref()?
            .trips
            .iter()
            .find(|trip| trip.id == trip_id)
    }

    /// Mutable access to the active trip.
    pub fn active_trip_mut(&mut self) -> Option<&mut Trip> {
        let trip_id = self.trip_id.as_deref()?;
        self.user
            .as_mut()?
            .trips
            .iter_mut()
            .find(|trip| trip.id == trip_id)
    }

    /// Checks the session-side tracking preconditions and returns the
    /// active trip.
    ///
    /// # Errors
    ///
    /// Returns the first unmet [`PreconditionNotMet`], checked in order:
    /// hydration, user, trip id, trip presence.
    pub fn readiness(&self) -> Result<&Trip, PreconditionNotMet> {
        if !self.hydrated {
            return Err(PreconditionNotMet::NotHydrated);
        }
        if self.user.is_none() {
            return Err(PreconditionNotMet::NoUser);
        }
        if self.trip_id.is_none() {
            return Err(PreconditionNotMet::NoActiveTrip);
        }
        self.active_trip()
            .ok_or(PreconditionNotMet::ActiveTripMissing)
    }
}
