//! Self-adjusting sampling loop.
//!
//! The scheduler owns exactly one repeating timer. Every tick requests
//! the device position, scores it against the geofence index, forwards
//! the sample to the reporter without waiting for it, and, when the
//! resulting cadence tier calls for a different interval, cancels the
//! timer and arms a new one at that interval.
//!
//! Position requests may resolve out of order. Each tick claims the
//! single "current request" slot; a response whose tick has since been
//! superseded (or whose scheduler has been stopped) is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use wayguard_geofence::GeofenceIndex;
use wayguard_tracking_models::{CadenceTier, LocationSample};
use wayguard_zone_models::GeoPoint;

use crate::classifier::tier_for;
use crate::clock::Clock;
use crate::position::{PositionOptions, PositionSource};
use crate::reporter::LocationReporter;
use crate::session::Session;
use crate::{GeolocationError, PreconditionNotMet};

/// Tier armed before the first successful sample.
pub const INITIAL_TIER: CadenceTier = CadenceTier::Caution;

/// Tunables that are not part of the cadence contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerSettings {
    /// Hints passed with each position request.
    pub options: PositionOptions,
    /// Give up on a position request after this long. `None` relies on
    /// the platform's own behaviour.
    pub position_timeout: Option<Duration>,
}

/// Result of [`SamplingScheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The loop was stopped and is now running.
    Started,
    /// The loop was already running; nothing changed.
    AlreadyRunning,
    /// A dependency is not ready; call `start` again once it is.
    Deferred(PreconditionNotMet),
}

/// Point-in-time view of the scheduler, for telemetry and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// Whether the loop is running.
    pub running: bool,
    /// Interval of the armed (or next armed) timer.
    pub interval: Duration,
    /// Tier of the most recent accepted sample.
    pub tier: Option<CadenceTier>,
    /// Ticks that issued a position request.
    pub ticks: u64,
    /// Timer rearms caused by tier changes.
    pub rearms: u64,
    /// Samples handed to the reporter.
    pub reports: u64,
    /// Position requests that failed.
    pub position_failures: u64,
    /// Position responses dropped because a newer tick superseded them.
    pub stale_responses: u64,
}

struct SchedulerState {
    running: bool,
    current_interval: Duration,
    current_tier: Option<CadenceTier>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every start and stop so ticks from an older run are ignored.
    generation: u64,
    /// The current-request slot.
    request_seq: u64,
    next_sequence: u64,
    ticks: u64,
    rearms: u64,
    reports: u64,
    position_failures: u64,
    stale_responses: u64,
}

struct SchedulerInner {
    index: Arc<GeofenceIndex>,
    position: Arc<dyn PositionSource>,
    reporter: Arc<dyn LocationReporter>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    state: Mutex<SchedulerState>,
}

/// The adaptive sampling loop. Cheap to clone; clones share one loop.
#[derive(Clone)]
pub struct SamplingScheduler {
    inner: Arc<SchedulerInner>,
}

impl SamplingScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(
        index: Arc<GeofenceIndex>,
        position: Arc<dyn PositionSource>,
        reporter: Arc<dyn LocationReporter>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                index,
                position,
                reporter,
                clock,
                settings,
                state: Mutex::new(SchedulerState {
                    running: false,
                    current_interval: INITIAL_TIER.interval(),
                    current_tier: None,
                    timer: None,
                    generation: 0,
                    request_seq: 0,
                    next_sequence: 0,
                    ticks: 0,
                    rearms: 0,
                    reports: 0,
                    position_failures: 0,
                    stale_responses: 0,
                }),
            }),
        }
    }

    /// Starts the loop if `session` and the geofence index are ready.
    ///
    /// Samples once immediately and arms the repeating timer at the last
    /// known interval. Idempotent while running. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self, session: &Session) -> StartOutcome {
        if let Err(reason) = session.readiness() {
            log::debug!("Sampling deferred: {reason}");
            return StartOutcome::Deferred(reason);
        }
        if !self.inner.index.is_loaded() {
            log::debug!("Sampling deferred: {}", PreconditionNotMet::ZonesNotLoaded);
            return StartOutcome::Deferred(PreconditionNotMet::ZonesNotLoaded);
        }

        let (generation, interval) = {
            let mut state = self.inner.lock();
            if state.running {
                return StartOutcome::AlreadyRunning;
            }
            state.running = true;
            state.generation += 1;
            let interval = state.current_interval;
            self.inner.rearm(&mut state, interval);
            (state.generation, interval)
        };

        log::info!("Sampling started at {interval:?} interval");
        SchedulerInner::spawn_tick(&self.inner, generation);
        StartOutcome::Started
    }

    /// Stops the loop: cancels the timer and clears the request slot so
    /// in-flight position responses are dropped. Always safe to call.
    pub fn stop(&self) {
        let mut state = self.inner.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        state.request_seq += 1;
        if std::mem::replace(&mut state.running, false) {
            log::info!("Sampling stopped");
        }
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Current counters and cadence.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.inner.lock();
        SchedulerSnapshot {
            running: state.running,
            interval: state.current_interval,
            tier: state.current_tier,
            ticks: state.ticks,
            rearms: state.rearms,
            reports: state.reports,
            position_failures: state.position_failures,
            stale_responses: state.stale_responses,
        }
    }
}

impl SchedulerInner {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels the armed timer, if any, and arms a new one at `interval`.
    /// The only place a timer is created.
    fn rearm(self: &Arc<Self>, state: &mut SchedulerState, interval: Duration) {
        if let Some(old) = state.timer.take() {
            old.abort();
        }
        state.current_interval = interval;

        let weak: Weak<Self> = Arc::downgrade(self);
        let generation = state.generation;
        state.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Self::spawn_tick(&inner, generation);
            }
        }));
    }

    fn spawn_tick(self: &Arc<Self>, generation: u64) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.tick(generation).await;
        });
    }

    async fn tick(self: Arc<Self>, generation: u64) {
        let seq = {
            let mut state = self.lock();
            if !state.running || state.generation != generation {
                return;
            }
            state.ticks += 1;
            state.request_seq += 1;
            state.request_seq
        };

        let result = self.request_position().await;

        let mut state = self.lock();
        if !state.running || state.generation != generation || state.request_seq != seq {
            state.stale_responses += 1;
            log::debug!("Dropping superseded position response #{seq}");
            return;
        }

        let point = match result {
            Ok(point) => point,
            Err(e) => {
                state.position_failures += 1;
                log::warn!("Position request failed, keeping current cadence: {e}");
                return;
            }
        };

        let score = self.index.score_at(point);
        let tier = tier_for(score);
        state.next_sequence += 1;
        let sample = LocationSample {
            point,
            score,
            tier,
            sequence: state.next_sequence,
            sampled_at: self.clock.now(),
        };
        log::debug!(
            "Sample #{} at ({}, {}): score {score}, tier {tier}",
            sample.sequence,
            point.latitude,
            point.longitude
        );

        state.current_tier = Some(tier);
        state.reports += 1;
        let reporter = Arc::clone(&self.reporter);
        tokio::spawn(async move {
            match reporter.report(&sample).await {
                Ok(()) => log::debug!("Reported sample #{}", sample.sequence),
                Err(e) => log::warn!("Failed to report sample #{}: {e}", sample.sequence),
            }
        });

        let interval = tier.interval();
        if interval != state.current_interval {
            log::info!(
                "Cadence {:?} -> {interval:?} (score {score}, tier {tier})",
                state.current_interval
            );
            state.rearms += 1;
            self.rearm(&mut state, interval);
        }
    }

    async fn request_position(&self) -> Result<GeoPoint, GeolocationError> {
        let request = self.position.current_position(self.settings.options);
        match self.settings.position_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or(Err(GeolocationError::Timeout)),
            None => request.await,
        }
    }
}
