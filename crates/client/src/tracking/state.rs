//! State shared between the tracking loop, its timers and the view.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ambulance_tracker_core::{Coordinates, SharingStatus, TrackingState};

/// Point-in-time copy of everything the dashboard displays.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingSnapshot {
    /// Status as last acknowledged or polled.
    pub status: SharingStatus,
    /// State machine position.
    pub state: TrackingState,
    /// Last successfully sampled position.
    pub last_location: Option<Coordinates>,
}

/// Cell holding the session's mutable state.
///
/// Every timer callback reads it at fire time. Locks are never held across
/// an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedTrackingState {
    inner: Arc<RwLock<TrackingSnapshot>>,
}

impl SharedTrackingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> TrackingSnapshot {
        *self.read()
    }

    /// Displayed sharing status.
    #[must_use]
    pub fn status(&self) -> SharingStatus {
        self.read().status
    }

    /// State machine position.
    #[must_use]
    pub fn tracking_state(&self) -> TrackingState {
        self.read().state
    }

    /// Overwrite the status, returning the previous value.
    pub fn set_status(&self, status: SharingStatus) -> SharingStatus {
        std::mem::replace(&mut self.write().status, status)
    }

    pub(crate) fn set_tracking_state(&self, state: TrackingState) {
        self.write().state = state;
    }

    pub(crate) fn record_location(&self, coords: Coordinates) {
        self.write().last_location = Some(coords);
    }

    // A panicking writer cannot leave a snapshot half-written; it is plain data.
    fn read(&self) -> RwLockReadGuard<'_, TrackingSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackingSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SharedTrackingState::new();
        assert_eq!(state.snapshot(), TrackingSnapshot::default());
        assert_eq!(state.status(), SharingStatus::Off);
        assert_eq!(state.tracking_state(), TrackingState::Idle);
    }

    #[test]
    fn test_clones_share_one_cell() {
        let state = SharedTrackingState::new();
        let view = state.clone();

        assert_eq!(state.set_status(SharingStatus::On), SharingStatus::Off);
        state.record_location(Coordinates::new(1.0, 2.0));

        let snapshot = view.snapshot();
        assert_eq!(snapshot.status, SharingStatus::On);
        assert_eq!(snapshot.last_location, Some(Coordinates::new(1.0, 2.0)));
    }
}
