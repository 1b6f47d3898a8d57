//! Scriptable collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use wayguard_tracking_models::{AuthResponse, LocationSample, Trip, TripStatus, User, UserRole};
use wayguard_zone_models::{GeoPoint, SafetyZone};

use crate::backend::{TripActions, ZoneSource};
use crate::clock::Clock;
use crate::notify::Notifier;
use crate::position::{PositionOptions, PositionSource};
use crate::reporter::LocationReporter;
use crate::session::Session;
use crate::{GeolocationError, NetworkError};

/// Lets every spawned task that is ready to run make progress.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Square around Connaught Place, New Delhi.
pub fn delhi_center_zone(score: i32) -> SafetyZone {
    zone("z-cp", score, [77.20, 28.62], [77.23, 28.64])
}

/// Rectangular zone from south-west `[lng, lat]` to north-east `[lng, lat]`.
pub fn zone(id: &str, score: i32, sw: [f64; 2], ne: [f64; 2]) -> SafetyZone {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": format!("Zone {id}"),
        "type": "custom",
        "safetyScore": score,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [sw[0], sw[1]],
                [ne[0], sw[1]],
                [ne[0], ne[1]],
                [sw[0], ne[1]],
                [sw[0], sw[1]]
            ]]
        }
    }))
    .unwrap()
}

pub const fn inside_delhi() -> GeoPoint {
    GeoPoint::new(28.63, 77.215)
}

pub const fn outside_delhi() -> GeoPoint {
    GeoPoint::new(28.70, 77.10)
}

pub fn tourist(trips: Vec<Trip>) -> User {
    User {
        id: "u-1".to_string(),
        name: Some("Asha".to_string()),
        phone_number: "+91 98100 00000".to_string(),
        email: "asha@example.com".to_string(),
        role: UserRole::Tourist,
        trips,
    }
}

/// Hydrated session whose active trip `t-1` is in `status`.
pub fn session_with(status: TripStatus) -> Session {
    Session::from_auth(AuthResponse {
        token: "tok".to_string(),
        user: tourist(vec![Trip {
            status,
            ..Trip::active("t-1")
        }]),
    })
}

/// Session whose trip `t-1` was selected at login and later moved to a
/// terminal `status`.
pub fn ended_session(status: TripStatus) -> Session {
    let mut session = ready_session();
    if let Some(trip) = session.active_trip_mut() {
        trip.status = status;
    }
    session
}

pub fn ready_session() -> Session {
    session_with(TripStatus::Active)
}

enum Scripted {
    Point(GeoPoint, Duration),
    Error(GeolocationError),
}

/// Serves queued responses first, then a repeating fallback point.
pub struct ScriptedPositions {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<GeoPoint>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl ScriptedPositions {
    pub fn repeating(point: GeoPoint) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(point),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_repeating(&self, point: GeoPoint) {
        *self.fallback.lock().unwrap() = point;
    }

    /// Delay applied to fallback responses.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn push_delayed(&self, point: GeoPoint, delay: Duration) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Scripted::Point(point, delay));
    }

    pub fn push_error(&self, error: GeolocationError) {
        self.queue.lock().unwrap().push_back(Scripted::Error(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionSource for ScriptedPositions {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<GeoPoint, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        let (point, delay) = match next {
            Some(Scripted::Error(e)) => return Err(e),
            Some(Scripted::Point(point, delay)) => (point, delay),
            None => (*self.fallback.lock().unwrap(), *self.delay.lock().unwrap()),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(point)
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    samples: Mutex<Vec<LocationSample>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn samples(&self) -> Vec<LocationSample> {
        self.samples.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationReporter for RecordingReporter {
    async fn report(&self, sample: &LocationSample) -> Result<(), NetworkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NetworkError::new("offline"));
        }
        self.samples.lock().unwrap().push(*sample);
        Ok(())
    }
}

/// Counts transition requests; optionally fails them with a server message.
#[derive(Default)]
pub struct FakeTripActions {
    pub pauses: Mutex<Vec<f64>>,
    pub resumes: AtomicUsize,
    pub snoozes: AtomicUsize,
    fail_with: Mutex<Option<NetworkError>>,
    resume_delay: Mutex<Duration>,
}

impl FakeTripActions {
    pub fn fail_with(&self, error: Option<NetworkError>) {
        *self.fail_with.lock().unwrap() = error;
    }

    pub fn set_resume_delay(&self, delay: Duration) {
        *self.resume_delay.lock().unwrap() = delay;
    }

    pub fn resume_calls(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn snooze_calls(&self) -> usize {
        self.snoozes.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> Vec<f64> {
        self.pauses.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), NetworkError> {
        self.fail_with.lock().unwrap().clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl TripActions for FakeTripActions {
    async fn pause(&self, duration_hours: f64) -> Result<(), NetworkError> {
        self.pauses.lock().unwrap().push(duration_hours);
        self.outcome()
    }

    async fn resume(&self) -> Result<(), NetworkError> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.resume_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.outcome()
    }

    async fn snooze(&self) -> Result<(), NetworkError> {
        self.snoozes.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }
}

/// Serves a fixed zone set, or fails until `set_offline(false)`.
pub struct StaticZones {
    zones: Vec<SafetyZone>,
    offline: AtomicBool,
    pub fetches: AtomicUsize,
}

impl StaticZones {
    pub fn new(zones: Vec<SafetyZone>) -> Self {
        Self {
            zones,
            offline: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ZoneSource for StaticZones {
    async fn fetch_zones(&self) -> Result<Vec<SafetyZone>, NetworkError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::new("offline"));
        }
        Ok(self.zones.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Info(String),
    Success(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.toasts.lock().unwrap().push(Toast::Info(message.to_string()));
    }

    fn success(&self, message: &str) {
        self.toasts
            .lock()
            .unwrap()
            .push(Toast::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.toasts
            .lock()
            .unwrap()
            .push(Toast::Error(message.to_string()));
    }
}

/// Wall clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
