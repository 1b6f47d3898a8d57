//! Trip status gating for the sampling loop.
//!
//! The controller owns the session and is the only place trip status is
//! mirrored locally. The backend remains authoritative: every user
//! transition is requested over [`TripActions`] first and mirrored only
//! once the request succeeds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use wayguard_tracking_models::{TripEvent, TripStatus};

use crate::backend::TripActions;
use crate::clock::Clock;
use crate::countdown::CheckInCountdown;
use crate::notify::Notifier;
use crate::scheduler::{SamplingScheduler, StartOutcome};
use crate::session::Session;
use crate::{PreconditionNotMet, TrackingError};

/// How long a confirmed check-in snoozes anomaly detection.
pub const SNOOZE_MINUTES: i64 = 10;

const RESUMING_MESSAGE: &str = "Resuming live tracking...";
const INVALID_HOURS_MESSAGE: &str = "Please enter a valid number of hours.";
const PAUSE_FAILED_MESSAGE: &str = "Failed to pause tracking.";
const CONFIRMED_MESSAGE: &str = "Safety confirmed. Thank you!";
const CONFIRM_FAILED_MESSAGE: &str = "Failed to confirm safety. Please try again.";

/// What [`TripLifecycleController::evaluate`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluateOutcome {
    /// The session is not ready; the scheduler is stopped.
    Deferred(PreconditionNotMet),
    /// The trip is paused until the given time; the scheduler is stopped.
    Paused {
        /// End of the pause.
        until: Option<DateTime<Utc>>,
    },
    /// An expired pause was resumed and the scheduler was (re)started.
    Resumed(StartOutcome),
    /// The pause has expired but another evaluation is already resuming.
    ResumePending,
    /// The pause has expired but the resume request failed. The next
    /// evaluation retries.
    ResumeFailed,
    /// The trip is trackable and the scheduler was asked to run.
    Tracking(StartOutcome),
    /// The trip is in a terminal status; the scheduler is stopped.
    NotTrackable(TripStatus),
}

/// Resets the resume in-flight flag when the resume attempt ends, even if
/// the evaluating future is dropped mid-request.
struct ResumeGuard<'a>(&'a AtomicBool);

impl Drop for ResumeGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Gates the [`SamplingScheduler`] on the active trip's status and drives
/// the check-in countdown.
pub struct TripLifecycleController {
    session: Mutex<Session>,
    scheduler: SamplingScheduler,
    countdown: CheckInCountdown,
    trips: Arc<dyn TripActions>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    resume_in_flight: AtomicBool,
    check_in_shown: AtomicBool,
}

impl TripLifecycleController {
    /// Creates a controller with an empty, unhydrated session.
    #[must_use]
    pub fn new(
        scheduler: SamplingScheduler,
        countdown: CheckInCountdown,
        trips: Arc<dyn TripActions>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session: Mutex::new(Session::default()),
            scheduler,
            countdown,
            trips,
            notifier,
            clock,
            resume_in_flight: AtomicBool::new(false),
            check_in_shown: AtomicBool::new(false),
        }
    }

    /// Installs a restored or freshly logged-in session and marks it
    /// hydrated. The next [`Self::evaluate`] may show the check-in prompt
    /// again if the trip is still in `CHECK_IN`.
    pub fn hydrate(&self, mut session: Session) {
        session.hydrated = true;
        log::debug!(
            "Session hydrated (active trip: {})",
            session.trip_id.as_deref().unwrap_or("none")
        );
        *self.lock_session() = session;
        self.check_in_shown.store(false, Ordering::SeqCst);
    }

    /// Re-checks every tracking precondition and starts or stops the
    /// scheduler accordingly.
    ///
    /// Resumes an expired pause (at most one resume request in flight),
    /// and shows the check-in prompt once per hydration when the trip is
    /// already in `CHECK_IN`.
    pub async fn evaluate(&self) -> EvaluateOutcome {
        let readiness = self
            .lock_session()
            .readiness()
            .map(|trip| (trip.status, trip.paused_until));
        let (status, paused_until) = match readiness {
            Ok(trip) => trip,
            Err(reason) => {
                self.scheduler.stop();
                return EvaluateOutcome::Deferred(reason);
            }
        };

        match status {
            TripStatus::Paused => {
                self.scheduler.stop();
                let now = self.clock.now();
                if paused_until.is_some_and(|until| now <= until) {
                    return EvaluateOutcome::Paused {
                        until: paused_until,
                    };
                }
                self.resume().await
            }
            TripStatus::CheckIn => {
                if !self.check_in_shown.swap(true, Ordering::SeqCst) {
                    log::info!("Trip is awaiting a check-in; showing prompt");
                    self.countdown.show();
                }
                EvaluateOutcome::Tracking(self.start_scheduler())
            }
            TripStatus::Active | TripStatus::Snoozed => {
                EvaluateOutcome::Tracking(self.start_scheduler())
            }
            TripStatus::Expired | TripStatus::Cancelled => {
                self.scheduler.stop();
                EvaluateOutcome::NotTrackable(status)
            }
        }
    }

    async fn resume(&self) -> EvaluateOutcome {
        if self.resume_in_flight.swap(true, Ordering::SeqCst) {
            return EvaluateOutcome::ResumePending;
        }
        let _guard = ResumeGuard(&self.resume_in_flight);

        log::info!("Pause expired; resuming trip");
        self.notifier.info(RESUMING_MESSAGE);

        if let Err(e) = self.trips.resume().await {
            log::warn!("Failed to resume trip: {e}");
            return EvaluateOutcome::ResumeFailed;
        }

        let session = {
            let mut session = self.lock_session();
            if let Some(trip) = session.active_trip_mut() {
                if trip.status == TripStatus::Paused {
                    trip.status = TripStatus::Active;
                    trip.paused_until = None;
                } else {
                    log::debug!("Trip moved to {} while resuming", trip.status);
                }
            }
            session
        };
        EvaluateOutcome::Resumed(self.scheduler.start(&session))
    }

    /// Applies a server push.
    ///
    /// `ARE_YOU_OKAY` moves any trackable trip to `CHECK_IN` and
    /// (re)starts the countdown; sampling keeps running. A paused trip is
    /// taken out of its pause. Returns `false` if the event was ignored.
    pub fn handle_event(&self, event: TripEvent) -> bool {
        match event {
            TripEvent::CheckInRequested { message } => {
                let mut session = self.lock_session();
                let now = self.clock.now();
                let Some(trip) = session.active_trip_mut() else {
                    log::warn!("Ignoring check-in request: no active trip");
                    return false;
                };
                if !trip.status.is_trackable() {
                    log::warn!("Ignoring check-in request for {} trip", trip.status);
                    return false;
                }

                log::info!(
                    "Server requested a check-in: {}",
                    message.as_deref().unwrap_or("no reason given")
                );
                trip.status = TripStatus::CheckIn;
                trip.check_in_started_at = Some(now);
                trip.paused_until = None;

                self.countdown.show();
                self.check_in_shown.store(true, Ordering::SeqCst);
                self.scheduler.start(&session);
                true
            }
        }
    }

    /// Pauses tracking for `hours`.
    ///
    /// Returns the end of the pause.
    ///
    /// # Errors
    ///
    /// * [`TrackingError::InvalidDuration`] if `hours` is not a positive
    ///   finite number. No request is made.
    /// * [`TrackingError::Precondition`] if no trip is ready.
    /// * [`TrackingError::InvalidTransition`] if the trip is not `ACTIVE`.
    /// * [`TrackingError::Network`] if the backend rejected the pause.
    pub async fn pause(&self, hours: f64) -> Result<DateTime<Utc>, TrackingError> {
        let Some(until) = pause_end(self.clock.now(), hours) else {
            self.notifier.error(INVALID_HOURS_MESSAGE);
            return Err(TrackingError::InvalidDuration { hours });
        };

        let status = self.lock_session().readiness()?.status;
        if status != TripStatus::Active {
            return Err(TrackingError::InvalidTransition {
                status,
                action: "pause",
            });
        }

        if let Err(e) = self.trips.pause(hours).await {
            log::warn!("Failed to pause trip: {e}");
            let message = if e.status.is_some() && !e.message.is_empty() {
                e.message.as_str()
            } else {
                PAUSE_FAILED_MESSAGE
            };
            self.notifier.error(message);
            return Err(e.into());
        }

        if let Some(trip) = self.lock_session().active_trip_mut() {
            trip.status = TripStatus::Paused;
            trip.paused_until = Some(until);
        }
        self.scheduler.stop();
        log::info!("Trip paused until {until}");
        self.notifier
            .success(&format!("Tracking paused for {hours} hour(s). Stay safe!"));
        Ok(until)
    }

    /// Confirms the user is safe in reply to a check-in request.
    ///
    /// Returns the end of the snooze.
    ///
    /// # Errors
    ///
    /// * [`TrackingError::Precondition`] if no trip is ready.
    /// * [`TrackingError::InvalidTransition`] if the trip is not in
    ///   `CHECK_IN`.
    /// * [`TrackingError::Network`] if the snooze request failed; the trip
    ///   stays in `CHECK_IN` and the prompt stays open.
    pub async fn confirm_safe(&self) -> Result<DateTime<Utc>, TrackingError> {
        let status = self.lock_session().readiness()?.status;
        if status != TripStatus::CheckIn {
            return Err(TrackingError::InvalidTransition {
                status,
                action: "confirm safety for",
            });
        }

        if let Err(e) = self.trips.snooze().await {
            log::warn!("Failed to confirm safety: {e}");
            self.notifier.error(CONFIRM_FAILED_MESSAGE);
            return Err(e.into());
        }

        let until = self.clock.now() + TimeDelta::minutes(SNOOZE_MINUTES);
        if let Some(trip) = self.lock_session().active_trip_mut() {
            trip.status = TripStatus::Snoozed;
            trip.snoozed_until = Some(until);
            trip.check_in_started_at = None;
        }
        self.countdown.confirm();
        log::info!("Safety confirmed; snoozed until {until}");
        self.notifier.success(CONFIRMED_MESSAGE);
        Ok(until)
    }

    /// Stops sampling and closes the check-in prompt.
    pub fn shutdown(&self) {
        self.scheduler.stop();
        self.countdown.cancel();
    }

    /// Shuts down and clears the session.
    pub fn logout(&self) {
        self.shutdown();
        self.lock_session().logout();
        log::info!("Logged out");
    }

    /// A copy of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.lock_session().clone()
    }

    /// Status of the active trip, if any.
    #[must_use]
    pub fn trip_status(&self) -> Option<TripStatus> {
        self.lock_session().active_trip().map(|trip| trip.status)
    }

    /// The sampling loop this controller gates.
    #[must_use]
    pub const fn scheduler(&self) -> &SamplingScheduler {
        &self.scheduler
    }

    /// The check-in countdown.
    #[must_use]
    pub const fn countdown(&self) -> &CheckInCountdown {
        &self.countdown
    }

    fn start_scheduler(&self) -> StartOutcome {
        let session = self.lock_session();
        self.scheduler.start(&session)
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `now + hours`, or `None` if `hours` is not a positive finite duration
/// that fits the calendar.
fn pause_end(now: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    if !hours.is_finite() || hours <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (hours * 3_600_000.0).round() as i64;
    now.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
