//! Device location sources.
//!
//! A [`Geolocator`] asynchronously yields the current [`Coordinates`] or
//! fails. No accuracy, timeout or permission-caching contract is implied:
//! every request may fail independently.

use std::path::PathBuf;

use ambulance_tracker_core::Coordinates;
use async_trait::async_trait;
use thiserror::Error;

/// Why a location request produced no coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user has not granted location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// A position could not be determined.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Request the current position.
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    coords: Coordinates,
}

impl FixedGeolocator {
    #[must_use]
    pub const fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coords)
    }
}

/// Re-reads a `{"latitude": .., "longitude": ..}` JSON file on every request.
///
/// Lets an external GPS daemon publish fixes by rewriting the file.
#[derive(Debug, Clone)]
pub struct FileGeolocator {
    path: PathBuf,
}

impl FileGeolocator {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Geolocator for FileGeolocator {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LocationError::Unavailable(format!("{}: {e}", self.path.display())))?;

        serde_json::from_str(&contents)
            .map_err(|e| LocationError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}

/// Used when no location source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}
