//! Tracker configuration.
//!
//! Defaults ship embedded in the binary (`config/default.toml`). A file
//! passed by the host replaces them field by field, and the
//! `WAYGUARD_API_URL` environment variable overrides the backend URL on
//! top of both. Tier intervals, score thresholds, and the check-in and
//! snooze windows are fixed and not configurable.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TrackingError;
use crate::position::PositionOptions;
use crate::scheduler::SchedulerSettings;

/// The embedded default configuration, as TOML.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Environment variable overriding [`TrackerConfig::api_base_url`].
pub const API_URL_ENV: &str = "WAYGUARD_API_URL";

/// Host-level tracker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Backend root URL; API paths are resolved under `<root>/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Optional position request timeout in seconds.
    #[serde(default)]
    pub position_timeout_secs: Option<u64>,
    /// How often the host re-evaluates tracking preconditions.
    #[serde(default = "default_readiness_poll_secs")]
    pub readiness_poll_secs: u64,
    /// Request GPS-grade fixes.
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
    /// Capacity of the inbound event queue.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:3001/".to_string()
}

const fn default_readiness_poll_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

const fn default_event_buffer() -> usize {
    16
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            position_timeout_secs: None,
            readiness_poll_secs: default_readiness_poll_secs(),
            high_accuracy: true,
            event_buffer: default_event_buffer(),
        }
    }
}

impl TrackerConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Config`] if the document is not valid TOML
    /// or a field has the wrong type.
    pub fn from_toml(source: &str) -> Result<Self, TrackingError> {
        toml::de::from_str(source).map_err(|e| TrackingError::Config {
            message: e.to_string(),
        })
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Config`] if the file cannot be read or
    /// parsed.
    pub fn from_file(path: &Path) -> Result<Self, TrackingError> {
        let source = std::fs::read_to_string(path).map_err(|e| TrackingError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        log::debug!("Loaded tracker config from {}", path.display());
        Self::from_toml(&source)
    }

    /// Applies `WAYGUARD_API_URL` if it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_api_url(std::env::var(API_URL_ENV).ok())
    }

    /// Replaces the backend URL when `url` is set and non-empty.
    #[must_use]
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            log::debug!("Using API URL override {url}");
            self.api_base_url = url;
        }
        self
    }

    /// Full API root, `<api_base_url>api`, tolerating a missing trailing
    /// slash on the base.
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}/api", self.api_base_url.trim_end_matches('/'))
    }

    /// Interval of the host's precondition re-check. Never zero.
    #[must_use]
    pub fn readiness_poll(&self) -> Duration {
        Duration::from_secs(self.readiness_poll_secs.max(1))
    }

    /// Scheduler tunables derived from this config.
    #[must_use]
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            options: PositionOptions {
                high_accuracy: self.high_accuracy,
            },
            position_timeout: self
                .position_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}
