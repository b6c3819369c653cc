//! Geographic coordinates.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair produced by the device's location source.
///
/// Values are passed through to the remote service unchanged; no range
/// clamping or rounding is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Degrees north (negative for south).
    pub latitude: f64,
    /// Degrees east (negative for west).
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}
