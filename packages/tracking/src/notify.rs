//! User-visible notification seam (toasts).
//!
//! Only actions the user triggered themselves (pause, "I am safe") and
//! automatic resume notices are surfaced; background sampling and
//! reporting failures are logged and never shown.

/// Presentation layer for short user-facing messages.
pub trait Notifier: Send + Sync {
    /// Neutral information.
    fn info(&self, message: &str);
    /// A user action succeeded.
    fn success(&self, message: &str);
    /// A user action failed and needs to be retried by the user.
    fn error(&self, message: &str);
}
