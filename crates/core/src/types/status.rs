//! Status enums for location sharing.

use serde::{Deserialize, Serialize};

/// Whether the ambulance is currently sharing its location.
///
/// Serialized as `"ON"` / `"OFF"`, matching the remote service's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharingStatus {
    On,
    #[default]
    Off,
}

impl SharingStatus {
    /// Returns `true` for [`SharingStatus::On`].
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for SharingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => write!(f, "ON"),
            Self::Off => write!(f, "OFF"),
        }
    }
}

impl std::str::FromStr for SharingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            _ => Err(format!("invalid sharing status: {s}")),
        }
    }
}

/// Position of the tracking state machine.
///
/// Only user-initiated transitions move between these states. The
/// background status poll changes [`SharingStatus`] but never this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Not sharing; no reporting sub-loop is scheduled.
    #[default]
    Idle,
    /// Sharing acknowledged; the reporting sub-loop was scheduled.
    Sharing,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sharing => write!(f, "sharing"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sharing_status_wire_format() {
        assert_eq!(serde_json::to_string(&SharingStatus::On).unwrap(), "\"ON\"");
        assert_eq!(
            serde_json::to_string(&SharingStatus::Off).unwrap(),
            "\"OFF\""
        );
        let parsed: SharingStatus = serde_json::from_str("\"ON\"").unwrap();
        assert_eq!(parsed, SharingStatus::On);
    }

    #[test]
    fn test_sharing_status_rejects_lowercase() {
        assert!(serde_json::from_str::<SharingStatus>("\"on\"").is_err());
        assert!("on".parse::<SharingStatus>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SharingStatus::default(), SharingStatus::Off);
        assert_eq!(TrackingState::default(), TrackingState::Idle);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(SharingStatus::On.to_string(), "ON");
        assert_eq!("OFF".parse::<SharingStatus>().unwrap(), SharingStatus::Off);
        assert_eq!(TrackingState::Sharing.to_string(), "sharing");
        assert!(SharingStatus::On.is_on());
        assert!(!SharingStatus::Off.is_on());
    }
}
