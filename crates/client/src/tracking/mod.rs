//! Location sharing state machine and its timers.
//!
//! # States
//!
//! ```text
//!            start_sharing (location ok, update acknowledged)
//!   Idle  ─────────────────────────────────────────────────▶  Sharing
//!   (OFF) ◀─────────────────────────────────────────────────  (ON)
//!            stop_sharing (update acknowledged)
//! ```
//!
//! Two independent timers run alongside the state machine:
//!
//! - **status poll**: every poll interval, `GET /fetch` and overwrite the
//!   displayed [`SharingStatus`]. Runs for the whole session regardless of
//!   state and never changes [`TrackingState`].
//! - **location report**: scheduled on entering `Sharing`; every report
//!   interval, re-sample the position and post it.
//!
//! Network and location failures inside either timer are logged and the
//! tick is skipped; the timer keeps running. Ticks are not sequenced, so a
//! late response may overwrite a newer one.
//!
//! # Report stop check
//!
//! The report timer halts itself when its stop check sees a status other
//! than ON. With [`ReportStopCheck::Captured`] (the default) the check only
//! sees the status captured when the timer was scheduled, so a status
//! change observed by polling never stops reporting; only an acknowledged
//! `stop_sharing` or teardown does. With [`ReportStopCheck::Live`] the check
//! re-reads the shared status at each tick, and a polled OFF silently halts
//! reporting while the state machine stays in `Sharing`.

mod state;
mod timer;

pub use state::{SharedTrackingState, TrackingSnapshot};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ambulance_tracker_core::{SharingStatus, TrackingState};
use tracing::{error, info, warn};

use crate::api::{StatusUpdate, TrackerApi};
use crate::geolocation::Geolocator;
use timer::RepeatingTask;

/// Shown when sharing cannot start because no position is available.
pub const LOCATION_PERMISSION_MESSAGE: &str = "Please allow location access and try again.";

/// Default cadence of both timers.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Which status the location report timer consults before each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStopCheck {
    /// Status captured when the timer was scheduled. Polled changes are
    /// never observed. Known quirk kept for compatibility.
    #[default]
    Captured,
    /// Shared status re-read at every tick.
    Live,
}

impl std::fmt::Display for ReportStopCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Captured => write!(f, "captured"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl std::str::FromStr for ReportStopCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "captured" => Ok(Self::Captured),
            "live" => Ok(Self::Live),
            _ => Err(format!("invalid report stop check: {s} (expected captured or live)")),
        }
    }
}

/// Timer cadences and stop-check behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingOptions {
    /// Status poll cadence.
    pub poll_interval: Duration,
    /// Location report cadence.
    pub report_interval: Duration,
    /// Report timer stop check.
    pub stop_check: ReportStopCheck,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_INTERVAL,
            report_interval: DEFAULT_INTERVAL,
            stop_check: ReportStopCheck::default(),
        }
    }
}

/// Result of [`TrackingLoop::start_sharing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Update acknowledged; reporting scheduled.
    Sharing,
    /// No position available; still idle.
    LocationUnavailable,
    /// The update call failed; still idle. Logged only.
    NotAcknowledged,
}

impl StartOutcome {
    /// Alert to show the driver, if any.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::LocationUnavailable => Some(LOCATION_PERMISSION_MESSAGE),
            Self::Sharing | Self::NotAcknowledged => None,
        }
    }
}

/// Result of [`TrackingLoop::stop_sharing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Update acknowledged; reporting cancelled.
    Stopped,
    /// The update call failed; state unchanged. Logged only.
    NotAcknowledged,
}

/// A running tracking session.
///
/// Owns both timers. Dropping the loop (or calling
/// [`shutdown`](Self::shutdown)) cancels them along with any in-flight
/// ticks.
pub struct TrackingLoop {
    api: Arc<dyn TrackerApi>,
    geolocator: Arc<dyn Geolocator>,
    options: TrackingOptions,
    state: SharedTrackingState,
    _poller: RepeatingTask,
    reporter: Mutex<Option<RepeatingTask>>,
}

impl std::fmt::Debug for TrackingLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingLoop")
            .field("options", &self.options)
            .field("state", &self.state.snapshot())
            .finish_non_exhaustive()
    }
}

impl TrackingLoop {
    /// Enter the tracking view: start idle and begin polling the status.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        api: Arc<dyn TrackerApi>,
        geolocator: Arc<dyn Geolocator>,
        options: TrackingOptions,
    ) -> Self {
        let state = SharedTrackingState::new();
        let poller = spawn_poller(Arc::clone(&api), state.clone(), options.poll_interval);

        info!(
            poll_ms = options.poll_interval.as_millis(),
            report_ms = options.report_interval.as_millis(),
            stop_check = %options.stop_check,
            "Tracking started"
        );

        Self {
            api,
            geolocator,
            options,
            state,
            _poller: poller,
            reporter: Mutex::new(None),
        }
    }

    /// Handle on the shared state, for rendering.
    #[must_use]
    pub const fn state(&self) -> &SharedTrackingState {
        &self.state
    }

    /// The options this loop was started with.
    #[must_use]
    pub const fn options(&self) -> TrackingOptions {
        self.options
    }

    /// Whether a location report timer is currently running.
    #[must_use]
    pub fn is_reporting(&self) -> bool {
        self.reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// `Idle → Sharing`.
    ///
    /// Samples the position, announces ON with it, and on acknowledgment
    /// schedules the report timer. A report timer already running is
    /// replaced rather than duplicated.
    pub async fn start_sharing(&self) -> StartOutcome {
        let coords = match self.geolocator.current_position().await {
            Ok(coords) => coords,
            Err(e) => {
                warn!(error = %e, "Location unavailable, sharing not started");
                return StartOutcome::LocationUnavailable;
            }
        };
        self.state.record_location(coords);
        info!(%coords, "Location fetched");

        match self.api.update_status(&StatusUpdate::on(coords)).await {
            Ok(ack) => {
                info!(response = %ack, "Sharing acknowledged");
                self.state.set_status(SharingStatus::On);
                self.state.set_tracking_state(TrackingState::Sharing);
                let reporter = self.spawn_reporter();
                self.set_reporter(Some(reporter));
                StartOutcome::Sharing
            }
            Err(e) => {
                error!(error = %e, "Error sending location");
                StartOutcome::NotAcknowledged
            }
        }
    }

    /// `Sharing → Idle`.
    ///
    /// The report timer is cancelled before OFF is announced, so no ON
    /// report can reach the server after the OFF. If the announcement is
    /// not acknowledged, a timer that was running is started again.
    pub async fn stop_sharing(&self) -> StopOutcome {
        let was_reporting = self
            .take_reporter()
            .is_some_and(|task| !task.is_finished());

        match self.api.update_status(&StatusUpdate::off()).await {
            Ok(ack) => {
                info!(response = %ack, "Sharing stopped");
                self.state.set_status(SharingStatus::Off);
                self.state.set_tracking_state(TrackingState::Idle);
                StopOutcome::Stopped
            }
            Err(e) => {
                error!(error = %e, "Error stopping location");
                if was_reporting {
                    let reporter = self.spawn_reporter();
                    self.set_reporter(Some(reporter));
                }
                StopOutcome::NotAcknowledged
            }
        }
    }

    /// Leave the tracking view, cancelling both timers.
    pub fn shutdown(self) {
        info!(state = %self.state.tracking_state(), "Tracking shut down");
    }

    fn take_reporter(&self) -> Option<RepeatingTask> {
        self.reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_reporter(&self, reporter: Option<RepeatingTask>) {
        // The previous timer, if any, is cancelled when dropped here.
        let previous = std::mem::replace(
            &mut *self.reporter.lock().unwrap_or_else(PoisonError::into_inner),
            reporter,
        );
        drop(previous);
    }

    fn spawn_reporter(&self) -> RepeatingTask {
        let api = Arc::clone(&self.api);
        let geolocator = Arc::clone(&self.geolocator);
        let state = self.state.clone();
        let stop_check = self.options.stop_check;
        let captured = state.status();

        RepeatingTask::spawn("location-report", self.options.report_interval, move || {
            let observed = match stop_check {
                ReportStopCheck::Captured => captured,
                ReportStopCheck::Live => state.status(),
            };
            if !observed.is_on() {
                info!(status = %observed, "Status is no longer ON, location reporting halted");
                return None;
            }

            let api = Arc::clone(&api);
            let geolocator = Arc::clone(&geolocator);
            let state = state.clone();
            Some(async move { report_location(api.as_ref(), geolocator.as_ref(), &state).await })
        })
    }
}

fn spawn_poller(
    api: Arc<dyn TrackerApi>,
    state: SharedTrackingState,
    period: Duration,
) -> RepeatingTask {
    RepeatingTask::spawn("status-poll", period, move || {
        let api = Arc::clone(&api);
        let state = state.clone();
        Some(async move { poll_status(api.as_ref(), &state).await })
    })
}

async fn poll_status(api: &dyn TrackerApi, state: &SharedTrackingState) {
    match api.fetch_status().await {
        Ok(status) => {
            let previous = state.set_status(status);
            if previous != status {
                info!(%previous, %status, "Status changed by server");
            }
        }
        Err(e) => error!(error = %e, "Error fetching status"),
    }
}

async fn report_location(
    api: &dyn TrackerApi,
    geolocator: &dyn Geolocator,
    state: &SharedTrackingState,
) {
    let coords = match geolocator.current_position().await {
        Ok(coords) => coords,
        Err(e) => {
            warn!(error = %e, "Location unavailable, report skipped");
            return;
        }
    };
    state.record_location(coords);

    match api.update_status(&StatusUpdate::on(coords)).await {
        Ok(_) => info!(%coords, "Location sent"),
        Err(e) => error!(error = %e, %coords, "Error sending location"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ambulance_tracker_core::Coordinates;

    use super::*;
    use crate::geolocation::{DeniedGeolocator, FixedGeolocator};
    use crate::test_support::{MockApi, ScriptedGeolocator};

    const SECOND: Duration = Duration::from_secs(1);

    fn fixed(lat: f64, lon: f64) -> Arc<FixedGeolocator> {
        Arc::new(FixedGeolocator::new(Coordinates::new(lat, lon)))
    }

    fn options(poll_interval: Duration, stop_check: ReportStopCheck) -> TrackingOptions {
        TrackingOptions {
            poll_interval,
            report_interval: SECOND,
            stop_check,
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_leaves_last_returned_status() {
        let api = Arc::new(MockApi::new().with_statuses([
            Some(SharingStatus::On),
            Some(SharingStatus::Off),
            Some(SharingStatus::On),
            Some(SharingStatus::Off),
        ]));
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        sleep_ms(4500).await;

        assert_eq!(api.fetch_calls(), 4);
        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_does_not_cancel_poll() {
        let api = Arc::new(MockApi::new().with_statuses([
            None,
            Some(SharingStatus::On),
            None,
        ]));
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        sleep_ms(1500).await;
        assert_eq!(tracking.state().status(), SharingStatus::Off);

        sleep_ms(1000).await;
        assert_eq!(tracking.state().status(), SharingStatus::On);

        // Third poll fails: status stays stale, polling continues.
        sleep_ms(2000).await;
        assert_eq!(api.fetch_calls(), 4);
        assert_eq!(tracking.state().status(), SharingStatus::On);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_location_denied_stays_off() {
        let api = Arc::new(MockApi::new());
        let tracking = TrackingLoop::start(
            api.clone(),
            Arc::new(DeniedGeolocator),
            TrackingOptions::default(),
        );

        let outcome = tracking.start_sharing().await;

        assert_eq!(outcome, StartOutcome::LocationUnavailable);
        assert_eq!(outcome.user_message(), Some(LOCATION_PERMISSION_MESSAGE));
        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Idle);
        assert!(api.updates().is_empty());
        assert!(!tracking.is_reporting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sends_on_and_reports_every_second() {
        let api = Arc::new(MockApi::new());
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        let outcome = tracking.start_sharing().await;

        assert_eq!(outcome, StartOutcome::Sharing);
        assert_eq!(
            api.updates(),
            vec![StatusUpdate::on(Coordinates::new(1.0, 2.0))]
        );
        assert_eq!(tracking.state().status(), SharingStatus::On);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Sharing);
        assert!(tracking.is_reporting());

        sleep_ms(3500).await;

        let updates = api.updates();
        assert_eq!(updates.len(), 4);
        assert!(
            updates
                .iter()
                .all(|u| *u == StatusUpdate::on(Coordinates::new(1.0, 2.0)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_not_acknowledged_stays_idle() {
        let api = Arc::new(MockApi::new().with_update_failures([0]));
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        let outcome = tracking.start_sharing().await;

        assert_eq!(outcome, StartOutcome::NotAcknowledged);
        assert_eq!(outcome.user_message(), None);
        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Idle);

        sleep_ms(3500).await;
        assert_eq!(api.update_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_sends_off_and_halts_reporting() {
        let api = Arc::new(MockApi::new());
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(2500).await;

        let outcome = tracking.stop_sharing().await;

        assert_eq!(outcome, StopOutcome::Stopped);
        assert_eq!(api.updates().last(), Some(&StatusUpdate::off()));
        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Idle);
        assert!(!tracking.is_reporting());

        let calls = api.update_calls();
        assert_eq!(calls, 4);
        sleep_ms(5000).await;
        assert_eq!(api.update_calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_not_acknowledged_keeps_reporting() {
        let api = Arc::new(MockApi::new().with_update_failures([1]));
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        let outcome = tracking.stop_sharing().await;

        assert_eq!(outcome, StopOutcome::NotAcknowledged);
        assert_eq!(tracking.state().status(), SharingStatus::On);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Sharing);

        sleep_ms(2500).await;
        assert_eq!(api.update_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_report_after_off_while_stop_awaits_ack() {
        let api = Arc::new(MockApi::new().with_off_ack_delay(Duration::from_secs(3)));
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(1500).await;

        let outcome = tracking.stop_sharing().await;
        sleep_ms(5000).await;

        assert_eq!(outcome, StopOutcome::Stopped);
        assert_eq!(
            api.updates(),
            vec![
                StatusUpdate::on(Coordinates::new(1.0, 2.0)),
                StatusUpdate::on(Coordinates::new(1.0, 2.0)),
                StatusUpdate::off(),
            ]
        );
        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_not_acknowledged_resumes_after_slow_failure() {
        // Call 2 is the OFF announcement.
        let api = Arc::new(
            MockApi::new()
                .with_update_failures([2])
                .with_off_ack_delay(Duration::from_secs(3)),
        );
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(1500).await;
        let outcome = tracking.stop_sharing().await;

        assert_eq!(outcome, StopOutcome::NotAcknowledged);
        assert!(tracking.is_reporting());
        assert_eq!(api.update_calls(), 3);

        sleep_ms(2500).await;
        assert_eq!(api.update_calls(), 5);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Sharing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_failure_does_not_cancel_reporting() {
        // Call 0 is the start announcement; calls 1 and 2 are report ticks.
        let api = Arc::new(MockApi::new().with_update_failures([1, 2]));
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(4500).await;

        assert_eq!(api.update_calls(), 5);
        assert!(tracking.is_reporting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_failure_skips_report_tick() {
        let api = Arc::new(MockApi::new());
        // Call 0 serves start_sharing; call 1 (first report tick) fails.
        let geolocator = Arc::new(ScriptedGeolocator::new(
            Coordinates::new(1.0, 2.0),
            [1],
        ));
        let tracking = TrackingLoop::start(api.clone(), geolocator.clone(), TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(3500).await;

        assert_eq!(geolocator.calls(), 4);
        assert_eq!(api.update_calls(), 3);
        assert!(tracking.is_reporting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_samples_fresh_location_each_tick() {
        let api = Arc::new(MockApi::new());
        let geolocator = Arc::new(ScriptedGeolocator::moving(Coordinates::new(1.0, 2.0), 0.5));
        let tracking = TrackingLoop::start(api.clone(), geolocator, TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(2500).await;

        assert_eq!(
            api.updates(),
            vec![
                StatusUpdate::on(Coordinates::new(1.0, 2.0)),
                StatusUpdate::on(Coordinates::new(1.5, 2.5)),
                StatusUpdate::on(Coordinates::new(2.0, 3.0)),
            ]
        );
        assert_eq!(
            tracking.state().snapshot().last_location,
            Some(Coordinates::new(2.0, 3.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_one_report_timer() {
        let api = Arc::new(MockApi::new());
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        tracking.start_sharing().await;
        sleep_ms(3500).await;

        // Two announcements plus three ticks from a single timer.
        assert_eq!(api.update_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_captured_stop_check_ignores_polled_off() {
        let api = Arc::new(MockApi::new().with_statuses([Some(SharingStatus::Off)]));
        let tracking = TrackingLoop::start(
            api.clone(),
            fixed(1.0, 2.0),
            options(Duration::from_millis(9500), ReportStopCheck::Captured),
        );

        tracking.start_sharing().await;
        sleep_ms(15_500).await;

        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Sharing);
        assert!(tracking.is_reporting());
        assert_eq!(api.update_calls(), 1 + 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_stop_check_halts_on_polled_off() {
        let api = Arc::new(MockApi::new().with_statuses([Some(SharingStatus::Off)]));
        let tracking = TrackingLoop::start(
            api.clone(),
            fixed(1.0, 2.0),
            options(Duration::from_millis(9500), ReportStopCheck::Live),
        );

        tracking.start_sharing().await;
        sleep_ms(15_500).await;

        // Reports at 1s..9s, poll sees OFF at 9.5s, the 10s tick halts.
        assert_eq!(api.update_calls(), 1 + 9);
        assert!(!tracking.is_reporting());
        assert_eq!(tracking.state().status(), SharingStatus::Off);
        assert_eq!(tracking.state().tracking_state(), TrackingState::Sharing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_both_timers() {
        let api = Arc::new(MockApi::new());
        let tracking = TrackingLoop::start(api.clone(), fixed(1.0, 2.0), TrackingOptions::default());

        tracking.start_sharing().await;
        sleep_ms(1500).await;
        tracking.shutdown();

        let (fetches, updates) = (api.fetch_calls(), api.update_calls());
        sleep_ms(10_000).await;

        assert_eq!(api.fetch_calls(), fetches);
        assert_eq!(api.update_calls(), updates);
    }

    #[test]
    fn test_stop_check_parse() {
        assert_eq!("captured".parse(), Ok(ReportStopCheck::Captured));
        assert_eq!(" LIVE ".parse(), Ok(ReportStopCheck::Live));
        assert!("sometimes".parse::<ReportStopCheck>().is_err());
        assert_eq!(ReportStopCheck::default(), ReportStopCheck::Captured);
    }
}
