//! The `track` subcommand: log in, track the active trip, and accept
//! line commands until `quit` or Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use wayguard_api::ApiClient;
use wayguard_tracking::TrackingError;
use wayguard_tracking::clock::SystemClock;
use wayguard_tracking::config::TrackerConfig;
use wayguard_tracking::lifecycle::EvaluateOutcome;
use wayguard_tracking::position::{FixedPosition, PositionSource, RoutePositions};
use wayguard_tracking::scheduler::StartOutcome;
use wayguard_tracking::session::Session;
use wayguard_tracking::tracker::{Tracker, TrackerServices};
use wayguard_tracking_models::TripEvent;
use wayguard_zone_models::GeoPoint;

use crate::command::{Command, HELP};
use crate::console::{ConsoleNotifier, format_status, spawn_countdown_printer};

/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "WAYGUARD_PASSWORD";

/// Where simulated positions come from.
#[derive(Debug, Clone)]
pub enum PositionArg {
    /// Always the same point.
    Fixed(GeoPoint),
    /// A JSON array of `{latitude, longitude}` walked in order.
    Route(PathBuf),
}

/// Options for [`run`].
#[derive(Debug, Clone)]
pub struct TrackArgs {
    /// The tourist's unique digital id.
    pub digital_id: String,
    /// Optional TOML config file.
    pub config: Option<PathBuf>,
    /// Simulated device position.
    pub position: PositionArg,
}

/// Loads `path` (or the embedded defaults) and applies environment
/// overrides.
///
/// # Errors
///
/// Returns [`TrackingError::Config`] if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<TrackerConfig, TrackingError> {
    let config = match path {
        Some(path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn read_route(path: &Path) -> Result<Vec<GeoPoint>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read route {}: {e}", path.display()))?;
    let points: Vec<GeoPoint> = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid route file {}: {e}", path.display()))?;
    if points.is_empty() {
        return Err(format!("Route {} has no points", path.display()).into());
    }
    Ok(points)
}

fn read_password() -> Result<String, Box<dyn std::error::Error>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV)
        && !password.is_empty()
    {
        return Ok(password);
    }
    Ok(dialoguer::Password::new()
        .with_prompt("Password")
        .interact()?)
}

/// Human-readable result of a tracking evaluation.
pub fn describe_outcome(outcome: EvaluateOutcome) -> String {
    match outcome {
        EvaluateOutcome::Deferred(reason) => format!("Not tracking yet: {reason}"),
        EvaluateOutcome::Paused { until: Some(until) } => {
            format!("Tracking paused until {}", until.format("%Y-%m-%d %H:%M UTC"))
        }
        EvaluateOutcome::Paused { until: None } => "Tracking paused".to_string(),
        EvaluateOutcome::Resumed(_) => "Pause expired; tracking resumed".to_string(),
        EvaluateOutcome::ResumePending => "Resuming tracking...".to_string(),
        EvaluateOutcome::ResumeFailed => {
            "Pause expired but the trip could not be resumed; will retry".to_string()
        }
        EvaluateOutcome::Tracking(StartOutcome::Deferred(reason)) => {
            format!("Not tracking yet: {reason}")
        }
        EvaluateOutcome::Tracking(_) => "Tracking live".to_string(),
        EvaluateOutcome::NotTrackable(status) => format!("Trip is {status}; nothing to track"),
    }
}

/// Reports errors that were not already shown as a toast.
fn report_action_error<T>(result: Result<T, TrackingError>) {
    match result {
        Ok(_) | Err(TrackingError::Network(_) | TrackingError::InvalidDuration { .. }) => {}
        Err(e) => eprintln!("[error] {e}"),
    }
}

/// Runs the `track` subcommand.
///
/// # Errors
///
/// Returns an error if the config, route, or credentials cannot be loaded,
/// if login fails, or if stdin cannot be read.
pub async fn run(args: TrackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let api = Arc::new(ApiClient::new(config.api_root())?);

    let password = read_password()?;
    println!("Logging in as {}...", args.digital_id);
    let session = Session::from_auth(api.login(&args.digital_id, &password).await?);
    if session.trip_id.is_none() {
        println!("This account has no active trip.");
    }

    let position: Arc<dyn PositionSource> = match args.position {
        PositionArg::Fixed(point) => Arc::new(FixedPosition(point)),
        PositionArg::Route(path) => Arc::new(RoutePositions::new(read_route(&path)?)),
    };

    let tracker = Arc::new(Tracker::new(
        &config,
        TrackerServices {
            position,
            reporter: api.clone(),
            trips: api.clone(),
            zones: api,
            notifier: Arc::new(ConsoleNotifier),
            clock: Arc::new(SystemClock),
        },
    ));

    let printer = spawn_countdown_printer(tracker.controller().countdown().subscribe(), 15);
    println!("{}", describe_outcome(tracker.start_tracking(session).await));

    let (events, events_rx) = tracker.event_channel();
    let listener = tracker.spawn_event_listener(events_rx);
    let poll = tracker.spawn_readiness_poll();

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    eprintln!("{message}");
                }
                continue;
            }
        };

        match command {
            Command::Pause(hours) => report_action_error(tracker.controller().pause(hours).await),
            Command::Safe => report_action_error(tracker.controller().confirm_safe().await),
            Command::Ping(message) => {
                events.send(TripEvent::CheckInRequested { message }).await?;
            }
            Command::Status => println!("{}", format_status(&tracker.status())),
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    log::info!("Stopping tracker");
    tracker.stop_tracking();
    poll.abort();
    drop(events);
    listener.await?;
    printer.abort();
    Ok(())
}
