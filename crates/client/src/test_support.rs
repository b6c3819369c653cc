//! Mock collaborators for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ambulance_tracker_core::{Coordinates, Credentials, SessionToken, SharingStatus};
use async_trait::async_trait;

use crate::api::{ApiError, StatusUpdate, TrackerApi};
use crate::geolocation::{Geolocator, LocationError};

fn unavailable() -> ApiError {
    ApiError::UnexpectedStatus {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

/// Scripted [`TrackerApi`] that records every call.
///
/// - `login` returns the configured result once, then `MissingToken`.
/// - `fetch_status` pops the next scripted status; `None` entries and an
///   empty script are network failures.
/// - `update_status` records every attempt on arrival and fails on the
///   configured zero-based call indices. OFF updates can be acknowledged
///   late.
#[derive(Default)]
pub(crate) struct MockApi {
    login: Mutex<Option<Result<String, ApiError>>>,
    statuses: Mutex<VecDeque<Option<SharingStatus>>>,
    update_failures: HashSet<usize>,
    off_ack_delay: Option<Duration>,
    updates: Mutex<Vec<StatusUpdate>>,
    login_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

#[allow(clippy::unwrap_used)]
impl MockApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_login(self, result: Result<&str, ApiError>) -> Self {
        *self.login.lock().unwrap() = Some(result.map(str::to_string));
        self
    }

    pub(crate) fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = Option<SharingStatus>>,
    ) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    pub(crate) fn with_update_failures(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.update_failures.extend(calls);
        self
    }

    pub(crate) fn with_off_ack_delay(mut self, delay: Duration) -> Self {
        self.off_ack_delay = Some(delay);
        self
    }

    pub(crate) fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)]
impl TrackerApi for MockApi {
    async fn login(&self, _credentials: &Credentials) -> Result<SessionToken, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match self.login.lock().unwrap().take() {
            Some(Ok(token)) => Ok(SessionToken::new(token)),
            Some(Err(e)) => Err(e),
            None => Err(ApiError::MissingToken),
        }
    }

    async fn fetch_status(&self) -> Result<SharingStatus, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(unavailable)
    }

    async fn update_status(&self, update: &StatusUpdate) -> Result<String, ApiError> {
        let call = {
            let mut updates = self.updates.lock().unwrap();
            updates.push(*update);
            updates.len() - 1
        };

        if let Some(delay) = self.off_ack_delay
            && !update.status.is_on()
        {
            tokio::time::sleep(delay).await;
        }

        if self.update_failures.contains(&call) {
            Err(unavailable())
        } else {
            Ok(r#"{"ok":true}"#.to_string())
        }
    }
}

/// [`Geolocator`] that fails on chosen calls and can drift each call.
pub(crate) struct ScriptedGeolocator {
    origin: Coordinates,
    step: f64,
    failures: HashSet<usize>,
    calls: AtomicUsize,
}

impl ScriptedGeolocator {
    /// Always `origin`, except on the zero-based `failures` calls.
    pub(crate) fn new(origin: Coordinates, failures: impl IntoIterator<Item = usize>) -> Self {
        Self {
            origin,
            step: 0.0,
            failures: failures.into_iter().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Call `n` yields `origin + n * step` on both axes.
    pub(crate) fn moving(origin: Coordinates, step: f64) -> Self {
        Self {
            step,
            ..Self::new(origin, [])
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geolocator for ScriptedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failures.contains(&call) {
            return Err(LocationError::Unavailable("no fix".to_string()));
        }

        #[allow(clippy::cast_precision_loss)]
        let offset = self.step * call as f64;
        Ok(Coordinates::new(
            self.origin.latitude + offset,
            self.origin.longitude + offset,
        ))
    }
}
