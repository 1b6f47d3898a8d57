#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP client for the Wayguard backend.
//!
//! All paths are resolved under `<base>/api` and carry the session's
//! bearer token once [`ApiClient::login`] has succeeded (or a token was
//! installed with [`ApiClient::set_token`]). The client implements the
//! tracking engine's [`ZoneSource`], [`LocationReporter`], and
//! [`TripActions`] seams. There is no retry: callers decide whether and
//! when to try again.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use wayguard_tracking::NetworkError;
use wayguard_tracking::backend::{TripActions, ZoneSource};
use wayguard_tracking::reporter::LocationReporter;
use wayguard_tracking_models::{AuthResponse, LocationSample};
use wayguard_zone_models::SafetyZone;

const USER_AGENT: &str = concat!("wayguard/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The server's `message` field, or the status reason.
        message: String,
    },

    /// A success response had an unexpected body.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

impl From<ApiError> for NetworkError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, message } => Self {
                message,
                status: Some(status),
            },
            ApiError::Http(e) => Self {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            ApiError::Parse { .. } => Self::new(e.to_string()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    unique_digital_id: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LocationBody {
    latitude: f64,
    longitude: f64,
}

impl From<&LocationSample> for LocationBody {
    fn from(sample: &LocationSample) -> Self {
        Self {
            latitude: sample.point.latitude,
            longitude: sample.point.longitude,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PauseBody {
    duration_in_hours: f64,
}

/// Backend client. Share it behind an `Arc`; the token is interior.
#[derive(Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    root: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Creates a client for `api_root` (e.g. `http://localhost:3001/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(api_root: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let root = api_root.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            root,
            token: RwLock::new(None),
        })
    }

    /// Installs (or clears) the bearer token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Whether a bearer token is installed.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// `POST /auth/login`. Installs the returned token on success.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails, the credentials are
    /// rejected, or the response is not an auth payload.
    pub async fn login(&self, digital_id: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginBody {
            unique_digital_id: digital_id,
            password,
        };
        let resp = self
            .send(self.client.post(self.url("/auth/login")).json(&body))
            .await?;
        let auth: AuthResponse = resp.json().await.map_err(|e| ApiError::Parse {
            message: format!("Invalid login response: {e}"),
        })?;

        log::info!(
            "Logged in as {} ({} trips)",
            auth.user.name.as_deref().unwrap_or(&auth.user.id),
            auth.user.trips.len()
        );
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    /// `GET /safety-zones`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a zone
    /// list.
    pub async fn safety_zones(&self) -> Result<Vec<SafetyZone>, ApiError> {
        let resp = self.send(self.client.get(self.url("/safety-zones"))).await?;
        resp.json().await.map_err(|e| ApiError::Parse {
            message: format!("Invalid safety zone list: {e}"),
        })
    }

    /// `POST /trips/location {latitude, longitude}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn update_location(&self, sample: &LocationSample) -> Result<(), ApiError> {
        self.send(
            self.client
                .post(self.url("/trips/location"))
                .json(&LocationBody::from(sample)),
        )
        .await?;
        Ok(())
    }

    /// `POST /trips/pause {durationInHours}`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn pause_trip(&self, duration_hours: f64) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("/trips/pause")).json(&PauseBody {
            duration_in_hours: duration_hours,
        }))
        .await?;
        Ok(())
    }

    /// `POST /trips/resume`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn resume_trip(&self) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("/trips/resume"))).await?;
        Ok(())
    }

    /// `POST /trips/snooze`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn snooze_trip(&self) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("/trips/snooze"))).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.root)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let token = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let req = match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        log::debug!("Backend returned {status}: {message}");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// The server's `{"message": ...}` if present, else the status reason.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), String::from)
        })
}

#[async_trait]
impl ZoneSource for ApiClient {
    async fn fetch_zones(&self) -> Result<Vec<SafetyZone>, NetworkError> {
        Ok(self.safety_zones().await?)
    }
}

#[async_trait]
impl LocationReporter for ApiClient {
    async fn report(&self, sample: &LocationSample) -> Result<(), NetworkError> {
        Ok(self.update_location(sample).await?)
    }
}

#[async_trait]
impl TripActions for ApiClient {
    async fn pause(&self, duration_hours: f64) -> Result<(), NetworkError> {
        Ok(self.pause_trip(duration_hours).await?)
    }

    async fn resume(&self) -> Result<(), NetworkError> {
        Ok(self.resume_trip().await?)
    }

    async fn snooze(&self) -> Result<(), NetworkError> {
        Ok(self.snooze_trip().await?)
    }
}
