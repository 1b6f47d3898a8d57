//! Terminal rendering for toasts, status, and the check-in prompt.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use wayguard_tracking::notify::Notifier;
use wayguard_tracking::tracker::TrackerStatus;
use wayguard_tracking_models::CountdownState;

/// Prints toasts to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        println!("[info] {message}");
    }

    fn success(&self, message: &str) {
        println!("[ok] {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("[error] {message}");
    }
}

/// One-line summary of the tracker state.
pub fn format_status(status: &TrackerStatus) -> String {
    let trip = status
        .trip
        .map_or_else(|| "no active trip".to_string(), |s| s.to_string());
    let cadence = if status.scheduler.running {
        let tier = status
            .scheduler
            .tier
            .map_or_else(|| "pending".to_string(), |t| t.to_string());
        format!(
            "sampling every {}s ({tier})",
            status.scheduler.interval.as_secs()
        )
    } else {
        "sampling stopped".to_string()
    };
    let check_in = if status.countdown.visible {
        format!(", check-in {}s left", status.countdown.remaining_seconds)
    } else {
        String::new()
    };

    format!(
        "Trip: {trip}; {cadence}; {} samples, {} failed fixes; {} zones{check_in}",
        status.scheduler.reports, status.scheduler.position_failures, status.zones
    )
}

/// Prints the check-in prompt when it opens, a reminder every
/// `reminder_every` seconds, and a notice when it closes.
pub fn spawn_countdown_printer(
    mut rx: watch::Receiver<CountdownState>,
    reminder_every: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut was_visible = false;
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            match (was_visible, state.visible) {
                (false, true) => println!(
                    "\n*** Are you okay? Type `safe` within {}s to confirm. ***",
                    state.remaining_seconds
                ),
                (true, true)
                    if reminder_every > 0 && state.remaining_seconds % reminder_every == 0 =>
                {
                    println!("Check-in: {}s left", state.remaining_seconds);
                }
                (true, false) if state.remaining_seconds == 0 => {
                    println!("Check-in window closed without confirmation.");
                }
                _ => {}
            }
            was_visible = state.visible;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use wayguard_tracking::scheduler::SchedulerSnapshot;
    use wayguard_tracking_models::{CadenceTier, TripStatus};

    fn status(running: bool, visible: bool) -> TrackerStatus {
        TrackerStatus {
            trip: Some(TripStatus::CheckIn),
            scheduler: SchedulerSnapshot {
                running,
                interval: Duration::from_secs(15),
                tier: Some(CadenceTier::HighAlert),
                ticks: 3,
                rearms: 1,
                reports: 3,
                position_failures: 0,
                stale_responses: 0,
            },
            countdown: CountdownState {
                remaining_seconds: 42,
                running: visible,
                visible,
            },
            zones: 12,
        }
    }

    #[test]
    fn formats_running_status() {
        assert_eq!(
            format_status(&status(true, true)),
            "Trip: CHECK_IN; sampling every 15s (HIGH_ALERT); 3 samples, 0 failed fixes; \
             12 zones, check-in 42s left"
        );
    }

    #[test]
    fn formats_stopped_status() {
        assert_eq!(
            format_status(&status(false, false)),
            "Trip: CHECK_IN; sampling stopped; 3 samples, 0 failed fixes; 12 zones"
        );
    }
}
