//! Integration tests for Ambulance Tracker.
//!
//! The tests drive the real reqwest client against [`FakeTracker`], an
//! in-process axum server that mimics the remote tracking service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ambulance-tracker-integration-tests
//! ```
//!
//! # Fake Service Behavior
//!
//! - `POST /login` - records the body and answers with the configured reply
//!   (default: `200 {"token": "test-token"}`)
//! - `GET /fetch` - returns the current status (default: `OFF`)
//! - `POST /UpdateStatus` - records the body; unless told to fail, stores
//!   the posted status as the current one (unless mirroring is off) and
//!   answers `200`

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ambulance_tracker_core::SharingStatus;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Canned answer for `POST /login`.
#[derive(Debug, Clone)]
pub struct LoginReply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl LoginReply {
    /// `200` with `{"token": token}`.
    #[must_use]
    pub fn token(token: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(json!({ "token": token })),
        }
    }

    /// `status` with `{"message": message}`.
    #[must_use]
    pub fn rejected(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "message": message })),
        }
    }

    /// `status` with an empty body.
    #[must_use]
    pub const fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }
}

struct FakeState {
    login_reply: Mutex<LoginReply>,
    status: Mutex<SharingStatus>,
    failing_updates: Mutex<usize>,
    mirror_updates: Mutex<bool>,
    logins: Mutex<Vec<Value>>,
    updates: Mutex<Vec<Value>>,
    fetches: Mutex<usize>,
    fetch_replies: Mutex<VecDeque<StatusCode>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the remote tracking service.
///
/// The server task is aborted when this is dropped.
pub struct FakeTracker {
    addr: SocketAddr,
    state: Arc<FakeState>,
    server: JoinHandle<()>,
}

impl FakeTracker {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(FakeState {
            login_reply: Mutex::new(LoginReply::token("test-token")),
            status: Mutex::new(SharingStatus::Off),
            failing_updates: Mutex::new(0),
            mirror_updates: Mutex::new(true),
            logins: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            fetch_replies: Mutex::new(VecDeque::new()),
        });

        let app = Router::new()
            .route("/login", post(login))
            .route("/fetch", get(fetch))
            .route("/UpdateStatus", post(update_status))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Base URL of the running server.
    ///
    /// # Panics
    ///
    /// Never in practice; a bound socket address always forms a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    /// Answer future logins with `reply`.
    pub fn set_login_reply(&self, reply: LoginReply) {
        *lock(&self.state.login_reply) = reply;
    }

    /// Overwrite the status served by `GET /fetch`.
    pub fn set_status(&self, status: SharingStatus) {
        *lock(&self.state.status) = status;
    }

    /// Current status as the server sees it.
    #[must_use]
    pub fn status(&self) -> SharingStatus {
        *lock(&self.state.status)
    }

    /// Answer the next `count` updates with `500`.
    pub fn fail_next_updates(&self, count: usize) {
        *lock(&self.state.failing_updates) = count;
    }

    /// Whether accepted updates change the served status.
    pub fn set_mirror_updates(&self, mirror: bool) {
        *lock(&self.state.mirror_updates) = mirror;
    }

    /// Answer the next fetches with these status codes instead of the status.
    pub fn script_fetch_failures(&self, codes: impl IntoIterator<Item = StatusCode>) {
        lock(&self.state.fetch_replies).extend(codes);
    }

    /// Login bodies received so far.
    #[must_use]
    pub fn logins(&self) -> Vec<Value> {
        lock(&self.state.logins).clone()
    }

    /// Update bodies received so far, including failed ones.
    #[must_use]
    pub fn updates(&self) -> Vec<Value> {
        lock(&self.state.updates).clone()
    }

    /// Number of `GET /fetch` requests received.
    #[must_use]
    pub fn fetches(&self) -> usize {
        *lock(&self.state.fetches)
    }
}

impl Drop for FakeTracker {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    lock(&state.logins).push(body);

    let reply = lock(&state.login_reply).clone();
    match reply.body {
        Some(body) => (reply.status, Json(body)).into_response(),
        None => reply.status.into_response(),
    }
}

async fn fetch(State(state): State<Arc<FakeState>>) -> Response {
    *lock(&state.fetches) += 1;

    if let Some(code) = lock(&state.fetch_replies).pop_front() {
        return code.into_response();
    }

    let status = *lock(&state.status);
    Json(json!({ "status": status })).into_response()
}

async fn update_status(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    lock(&state.updates).push(body.clone());

    {
        let mut failing = lock(&state.failing_updates);
        if *failing > 0 {
            *failing -= 1;
            return (StatusCode::INTERNAL_SERVER_ERROR, "update failed").into_response();
        }
    }

    if !*lock(&state.mirror_updates) {
        return (StatusCode::OK, "Status updated").into_response();
    }

    if let Some(status) = body
        .get("status")
        .and_then(|s| serde_json::from_value::<SharingStatus>(s.clone()).ok())
    {
        *lock(&state.status) = status;
    }

    (StatusCode::OK, "Status updated").into_response()
}
