//! Host-facing facade.
//!
//! [`Tracker`] wires the geofence index, sampling scheduler, countdown,
//! and lifecycle controller together from a [`TrackerConfig`] and a set
//! of [`TrackerServices`], and offers the few entry points a host needs:
//! start, refresh, stop, and the inbound event and readiness tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use wayguard_geofence::{GeofenceIndex, LoadSummary};
use wayguard_tracking_models::{CountdownState, TripEvent, TripStatus};

use crate::NetworkError;
use crate::backend::{TripActions, ZoneSource};
use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::countdown::CheckInCountdown;
use crate::lifecycle::{EvaluateOutcome, TripLifecycleController};
use crate::notify::Notifier;
use crate::position::PositionSource;
use crate::reporter::LocationReporter;
use crate::scheduler::{SamplingScheduler, SchedulerSnapshot};
use crate::session::Session;

/// External collaborators the tracker talks to.
pub struct TrackerServices {
    /// Device position.
    pub position: Arc<dyn PositionSource>,
    /// Sample sink.
    pub reporter: Arc<dyn LocationReporter>,
    /// Trip status transitions.
    pub trips: Arc<dyn TripActions>,
    /// Safety zone source.
    pub zones: Arc<dyn ZoneSource>,
    /// Toast layer.
    pub notifier: Arc<dyn Notifier>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
}

/// Combined view for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStatus {
    /// Status of the active trip, if any.
    pub trip: Option<TripStatus>,
    /// Sampling loop state.
    pub scheduler: SchedulerSnapshot,
    /// Check-in prompt state.
    pub countdown: CountdownState,
    /// Number of indexed zones.
    pub zones: usize,
}

/// The assembled tracking engine.
pub struct Tracker {
    index: Arc<GeofenceIndex>,
    zones: Arc<dyn ZoneSource>,
    controller: Arc<TripLifecycleController>,
    event_buffer: usize,
    readiness_poll: Duration,
    stopped: AtomicBool,
}

impl Tracker {
    /// Assembles a stopped tracker.
    #[must_use]
    pub fn new(config: &TrackerConfig, services: TrackerServices) -> Self {
        let index = Arc::new(GeofenceIndex::new());
        let scheduler = SamplingScheduler::new(
            Arc::clone(&index),
            services.position,
            services.reporter,
            Arc::clone(&services.clock),
            config.scheduler_settings(),
        );
        let controller = Arc::new(TripLifecycleController::new(
            scheduler,
            CheckInCountdown::new(),
            services.trips,
            services.notifier,
            services.clock,
        ));

        Self {
            index,
            zones: services.zones,
            controller,
            event_buffer: config.event_buffer.max(1),
            readiness_poll: config.readiness_poll(),
            stopped: AtomicBool::new(true),
        }
    }

    /// Fetches the zone set and swaps it into the index.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the zones could not be fetched. The
    /// previously loaded set, if any, stays in place.
    pub async fn load_zones(&self) -> Result<LoadSummary, NetworkError> {
        let zones = self.zones.fetch_zones().await?;
        let summary = self.index.load(&zones);
        log::info!(
            "Loaded {} safety zones ({} skipped)",
            summary.indexed,
            summary.skipped
        );
        Ok(summary)
    }

    /// Installs `session`, loads zones if they are not loaded yet, and
    /// evaluates whether sampling should run.
    pub async fn start_tracking(&self, session: Session) -> EvaluateOutcome {
        self.stopped.store(false, Ordering::SeqCst);
        self.controller.hydrate(session);
        self.refresh().await
    }

    /// Retries a failed zone load, then re-evaluates the tracking
    /// preconditions.
    pub async fn refresh(&self) -> EvaluateOutcome {
        if !self.index.is_loaded()
            && let Err(e) = self.load_zones().await
        {
            log::warn!("Failed to load safety zones: {e}");
        }
        let outcome = self.controller.evaluate().await;
        log::debug!("Evaluated tracking: {outcome:?}");
        outcome
    }

    /// Stops sampling and closes the check-in prompt. Background tasks
    /// stay idle until the next [`Tracker::start_tracking`].
    pub fn stop_tracking(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.controller.shutdown();
    }

    /// Whether [`Tracker::stop_tracking`] was called since the last start.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn poll_once(&self) {
        if self.is_stopped() {
            return;
        }
        self.refresh().await;
        // A stop that landed while the refresh was in flight still wins.
        if self.is_stopped() {
            self.controller.shutdown();
        }
    }

    /// Creates the inbound event channel, sized from the config.
    #[must_use]
    pub fn event_channel(&self) -> (mpsc::Sender<TripEvent>, mpsc::Receiver<TripEvent>) {
        mpsc::channel(self.event_buffer)
    }

    /// Applies server pushes from `events` until every sender is dropped.
    /// Pushes received while stopped are dropped.
    pub fn spawn_event_listener(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<TripEvent>,
    ) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tracker.is_stopped() {
                    log::debug!("Ignoring server event {event:?} while stopped");
                    continue;
                }
                log::debug!("Received server event {event:?}");
                tracker.controller.handle_event(event);
            }
            log::debug!("Event channel closed");
        })
    }

    /// Re-evaluates on a fixed period so pause expiry and late zone loads
    /// are picked up without user action. Idle while stopped; ends when
    /// the tracker is dropped.
    pub fn spawn_readiness_poll(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.readiness_poll;
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(tracker) = weak.upgrade() else {
                    break;
                };
                tracker.poll_once().await;
            }
        })
    }

    /// Current trip, sampling, and prompt state.
    #[must_use]
    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            trip: self.controller.trip_status(),
            scheduler: self.controller.scheduler().snapshot(),
            countdown: self.controller.countdown().snapshot(),
            zones: self.index.len(),
        }
    }

    /// The lifecycle controller, for user actions.
    #[must_use]
    pub const fn controller(&self) -> &Arc<TripLifecycleController> {
        &self.controller
    }

    /// The geofence index.
    #[must_use]
    pub const fn index(&self) -> &Arc<GeofenceIndex> {
        &self.index
    }
}
