//! Tracker configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional.
//!
//! - `TRACKER_BASE_URL` - Remote service origin (default: `https://esp-server-c5yc.onrender.com`)
//! - `TRACKER_POLL_INTERVAL_MS` - Status poll cadence (default: 1000)
//! - `TRACKER_REPORT_INTERVAL_MS` - Location report cadence (default: 1000)
//! - `TRACKER_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `TRACKER_TOKEN_PATH` - Session token file (default: `.ambulance-tracker/session.json`)
//! - `TRACKER_REPORT_STOP_CHECK` - `captured` or `live` (default: captured)
//! - `TRACKER_SHOW_EMERGENCY_BUTTON` - Show the emergency action (default: false)
//! - `TRACKER_LATITUDE` / `TRACKER_LONGITUDE` - Fixed position (set both or neither)
//! - `TRACKER_LOCATION_FILE` - JSON position file, re-read on every request
//! - `TRACKER_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ambulance_tracker_core::Coordinates;
use thiserror::Error;
use url::Url;

use crate::dashboard::DashboardOptions;
use crate::geolocation::{DeniedGeolocator, FileGeolocator, FixedGeolocator, Geolocator};
use crate::tracking::{ReportStopCheck, TrackingOptions};

/// Origin of the deployed tracking service.
pub const DEFAULT_BASE_URL: &str = "https://esp-server-c5yc.onrender.com";
const DEFAULT_INTERVAL_MS: &str = "1000";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "30";
const DEFAULT_TOKEN_PATH: &str = ".ambulance-tracker/session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the device position comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    /// Nothing configured; every request is denied.
    Denied,
    /// Constant position.
    Fixed(Coordinates),
    /// JSON file re-read on every request.
    File(PathBuf),
}

impl LocationSource {
    /// Build the matching [`Geolocator`].
    #[must_use]
    pub fn geolocator(&self) -> Arc<dyn Geolocator> {
        match self {
            Self::Denied => Arc::new(DeniedGeolocator),
            Self::Fixed(coords) => Arc::new(FixedGeolocator::new(*coords)),
            Self::File(path) => Arc::new(FileGeolocator::new(path.clone())),
        }
    }
}

/// Tracker client configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Remote service base URL
    pub base_url: Url,
    /// Status poll cadence
    pub poll_interval: Duration,
    /// Location report cadence
    pub report_interval: Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Session token file
    pub token_path: PathBuf,
    /// Report timer stop check
    pub report_stop_check: ReportStopCheck,
    /// Show the emergency action on the dashboard
    pub show_emergency_button: bool,
    /// Device position source
    pub location: LocationSource,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(&lookup);

        let base_url = parse_base_url(&env.get_or_default("TRACKER_BASE_URL", DEFAULT_BASE_URL))?;
        let poll_interval = env.millis("TRACKER_POLL_INTERVAL_MS")?;
        let report_interval = env.millis("TRACKER_REPORT_INTERVAL_MS")?;
        let http_timeout = Duration::from_secs(
            env.positive("TRACKER_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        );
        let token_path = PathBuf::from(env.get_or_default("TRACKER_TOKEN_PATH", DEFAULT_TOKEN_PATH));
        let report_stop_check = env
            .get_or_default("TRACKER_REPORT_STOP_CHECK", "captured")
            .parse::<ReportStopCheck>()
            .map_err(|e| ConfigError::InvalidEnvVar("TRACKER_REPORT_STOP_CHECK".to_string(), e))?;
        let show_emergency_button = env.flag("TRACKER_SHOW_EMERGENCY_BUTTON")?;
        let location = env.location()?;
        let log_json = env.flag("TRACKER_LOG_JSON")?;

        Ok(Self {
            base_url,
            poll_interval,
            report_interval,
            http_timeout,
            token_path,
            report_stop_check,
            show_emergency_button,
            location,
            log_json,
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Timer settings for [`TrackingLoop`](crate::tracking::TrackingLoop).
    #[must_use]
    pub const fn tracking_options(&self) -> TrackingOptions {
        TrackingOptions {
            poll_interval: self.poll_interval,
            report_interval: self.report_interval,
            stop_check: self.report_stop_check,
        }
    }

    /// Dashboard presentation options.
    #[must_use]
    pub const fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            show_emergency_button: self.show_emergency_button,
        }
    }
}

/// Parse and validate a service base URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` unless `value` is an http(s) URL.
pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("TRACKER_BASE_URL".to_string(), reason);

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Lookup<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Lookup<'_, F> {
    /// Get an optional variable; blank values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn positive(&self, key: &str, default: &str) -> Result<u64, ConfigError> {
        let value = self
            .get_or_default(key, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

        if value == 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        Ok(value)
    }

    fn millis(&self, key: &str) -> Result<Duration, ConfigError> {
        self.positive(key, DEFAULT_INTERVAL_MS)
            .map(Duration::from_millis)
    }

    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("0" | "false" | "no" | "off") => Ok(false),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some(other) => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{other}'"),
            )),
        }
    }

    fn coordinate(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get(key)
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }

    fn location(&self) -> Result<LocationSource, ConfigError> {
        if let Some(path) = self.get("TRACKER_LOCATION_FILE") {
            return Ok(LocationSource::File(PathBuf::from(path)));
        }

        let latitude = self.coordinate("TRACKER_LATITUDE")?;
        let longitude = self.coordinate("TRACKER_LONGITUDE")?;

        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Ok(LocationSource::Fixed(Coordinates::new(lat, lon))),
            (None, None) => Ok(LocationSource::Denied),
            _ => Err(ConfigError::InvalidEnvVar(
                "TRACKER_LATITUDE/TRACKER_LONGITUDE".to_string(),
                "Both TRACKER_LATITUDE and TRACKER_LONGITUDE must be set together".to_string(),
            )),
        }
    }
}
