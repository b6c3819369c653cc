//! Remote tracking service API.
//!
//! The service is an opaque HTTP/JSON collaborator exposing three endpoints:
//!
//! | Method | Path            | Body                                  | Response              |
//! |--------|-----------------|---------------------------------------|-----------------------|
//! | POST   | `/login`        | `{email, password}`                   | `{token}` or `{message}` |
//! | GET    | `/fetch`        | -                                     | `{status}`            |
//! | POST   | `/UpdateStatus` | `{status, latitude, longitude}`       | anything (logged)     |
//!
//! [`TrackerApi`] is the seam the session gate and tracking loop talk to;
//! [`HttpTrackerApi`] is the reqwest-backed implementation.

pub mod auth;
pub mod client;

pub use client::HttpTrackerApi;

use ambulance_tracker_core::{Coordinates, Credentials, SessionToken, SharingStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the remote tracking service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built from the configured base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The login endpoint rejected the credentials.
    #[error("Login rejected (HTTP {status})")]
    LoginRejected {
        /// HTTP status code of the rejection.
        status: u16,
        /// Human-readable `message` field from the error body, if present.
        message: Option<String>,
    },

    /// The login endpoint succeeded but returned no token.
    #[error("Login response did not contain a token")]
    MissingToken,

    /// A non-login endpoint returned a non-success status.
    #[error("Unexpected HTTP {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body text (may be empty).
        body: String,
    },
}

/// Body of `POST /UpdateStatus`.
///
/// Coordinates serialize as `null` when sharing is turned off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Requested sharing status.
    pub status: SharingStatus,
    /// Latitude, or `null` when stopping.
    pub latitude: Option<f64>,
    /// Longitude, or `null` when stopping.
    pub longitude: Option<f64>,
}

impl StatusUpdate {
    /// Sharing is on and the ambulance is at `coords`.
    #[must_use]
    pub const fn on(coords: Coordinates) -> Self {
        Self {
            status: SharingStatus::On,
            latitude: Some(coords.latitude),
            longitude: Some(coords.longitude),
        }
    }

    /// Sharing is off; coordinates are cleared.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            status: SharingStatus::Off,
            latitude: None,
            longitude: None,
        }
    }
}

/// Body of a `GET /fetch` response.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct FetchResponse {
    pub status: SharingStatus,
}

/// Operations the front-end performs against the remote service.
///
/// Implementations must be cheap to share across tasks; the tracking loop
/// calls them concurrently from independent timer ticks.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Exchange credentials for a session token.
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, ApiError>;

    /// Read the authoritative sharing status.
    async fn fetch_status(&self) -> Result<SharingStatus, ApiError>;

    /// Report a status change or location update.
    ///
    /// Returns the acknowledgment body as text; it is only ever logged.
    async fn update_status(&self, update: &StatusUpdate) -> Result<String, ApiError>;
}
