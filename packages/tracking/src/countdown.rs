//! One-minute check-in countdown.
//!
//! Shown when the server asks the user to confirm they are safe. Ticks
//! once per second; at zero it closes itself. Only one ticker exists at a
//! time: showing the prompt again restarts the countdown instead of
//! stacking a second ticker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use wayguard_tracking_models::CountdownState;

/// Length of the check-in window in seconds.
pub const CHECK_IN_WINDOW_SECS: u32 = 60;

const TICK: Duration = Duration::from_secs(1);

struct CountdownInner {
    state: watch::Sender<CountdownState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    window: u32,
}

/// The check-in countdown. Clones share one countdown.
#[derive(Clone)]
pub struct CheckInCountdown {
    inner: Arc<CountdownInner>,
}

impl Default for CheckInCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckInCountdown {
    /// Creates a hidden countdown with the standard window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(CHECK_IN_WINDOW_SECS)
    }

    /// Creates a hidden countdown with a custom window length.
    #[must_use]
    pub fn with_window(window: u32) -> Self {
        let (state, _) = watch::channel(CountdownState::default());
        Self {
            inner: Arc::new(CountdownInner {
                state,
                ticker: Mutex::new(None),
                window,
            }),
        }
    }

    /// Shows the prompt and (re)starts the countdown from the full window.
    /// Must be called from within a Tokio runtime.
    pub fn show(&self) {
        let mut ticker = self.inner.lock_ticker();
        if let Some(old) = ticker.take() {
            old.abort();
        }

        self.inner.state.send_replace(CountdownState {
            remaining_seconds: self.inner.window,
            running: true,
            visible: true,
        });
        log::info!("Check-in countdown started ({}s)", self.inner.window);

        let weak = Arc::downgrade(&self.inner);
        *ticker = Some(tokio::spawn(run_ticker(weak)));
    }

    /// The user confirmed. Stops the countdown and hides the prompt; the
    /// remaining seconds are left as they were.
    pub fn confirm(&self) {
        self.halt();
        log::debug!(
            "Check-in confirmed with {}s left",
            self.snapshot().remaining_seconds
        );
    }

    /// Dismisses the prompt without confirming.
    pub fn cancel(&self) {
        self.halt();
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> CountdownState {
        *self.inner.state.borrow()
    }

    /// Receives every state change, one per tick while running.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.inner.state.subscribe()
    }

    fn halt(&self) {
        if let Some(ticker) = self.inner.lock_ticker().take() {
            ticker.abort();
        }
        self.inner.state.send_modify(|state| {
            state.running = false;
            state.visible = false;
        });
    }
}

impl CountdownInner {
    fn lock_ticker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_ticker(inner: Weak<CountdownInner>) {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let mut expired = false;
        inner.state.send_modify(|state| {
            state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
            if state.remaining_seconds == 0 {
                state.running = false;
                state.visible = false;
                expired = true;
            }
        });

        if expired {
            log::info!("Check-in countdown expired without confirmation");
            inner.lock_ticker().take();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::settle;

    async fn advance_secs(secs: u64) {
        for _ in 0..secs {
            tokio::time::sleep(TICK).await;
            settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn starts_hidden() {
        let countdown = CheckInCountdown::new();
        assert_eq!(countdown.snapshot(), CountdownState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_zero_and_hides() {
        let countdown = CheckInCountdown::new();
        countdown.show();
        assert_eq!(
            countdown.snapshot(),
            CountdownState {
                remaining_seconds: 60,
                running: true,
                visible: true,
            }
        );

        advance_secs(59).await;
        let state = countdown.snapshot();
        assert_eq!(state.remaining_seconds, 1);
        assert!(state.running);

        advance_secs(1).await;
        assert_eq!(
            countdown.snapshot(),
            CountdownState {
                remaining_seconds: 0,
                running: false,
                visible: false,
            }
        );

        // Nothing ticks after expiry.
        advance_secs(5).await;
        assert_eq!(countdown.snapshot().remaining_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_stops_where_it_was() {
        let countdown = CheckInCountdown::new();
        countdown.show();
        advance_secs(10).await;

        countdown.confirm();
        advance_secs(30).await;

        assert_eq!(
            countdown.snapshot(),
            CountdownState {
                remaining_seconds: 50,
                running: false,
                visible: false,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn show_again_restarts_single_ticker() {
        let countdown = CheckInCountdown::new();
        countdown.show();
        advance_secs(20).await;
        assert_eq!(countdown.snapshot().remaining_seconds, 40);

        countdown.show();
        assert_eq!(countdown.snapshot().remaining_seconds, 60);

        advance_secs(10).await;
        // One ticker: ten seconds elapsed means ten decrements.
        assert_eq!(countdown.snapshot().remaining_seconds, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_hides_without_ticking() {
        let countdown = CheckInCountdown::with_window(5);
        countdown.show();
        advance_secs(2).await;
        countdown.cancel();
        advance_secs(5).await;

        let state = countdown.snapshot();
        assert_eq!(state.remaining_seconds, 3);
        assert!(!state.visible);
        assert!(!state.running);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_every_tick() {
        let countdown = CheckInCountdown::with_window(3);
        let mut rx = countdown.subscribe();
        countdown.show();

        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            seen.push(state.remaining_seconds);
            if !state.running {
                break;
            }
        }

        assert_eq!(seen, vec![3, 2, 1, 0]);
    }
}
