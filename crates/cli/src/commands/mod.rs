//! Subcommand implementations.

pub mod dashboard;
pub mod login;
pub mod logout;

use std::sync::Arc;

use ambulance_tracker_client::api::{ApiError, HttpTrackerApi};
use ambulance_tracker_client::config::{ConfigError, TrackerConfig};
use ambulance_tracker_client::session::{FileTokenStore, SessionGate, TokenStoreError};
use thiserror::Error;

/// Errors that end a command with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Api(#[from] ApiError),

    /// Session token file could not be read or written.
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    /// Terminal I/O failed.
    #[error("Terminal error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-interactive login was rejected.
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// Input closed before a required answer was given.
    #[error("Input closed before {0} was entered")]
    InputClosed(&'static str),

    /// The dashboard needs a stored session.
    #[error("Not logged in. Run `ambulance-tracker login` first.")]
    NotLoggedIn,
}

/// Session gate over the HTTP API and the configured token file.
fn session_gate(config: &TrackerConfig) -> Result<(SessionGate, Arc<HttpTrackerApi>), CliError> {
    let api = Arc::new(HttpTrackerApi::new(
        config.base_url.clone(),
        config.http_timeout,
    )?);
    let store = Arc::new(FileTokenStore::new(config.token_path.clone()));
    let gate = SessionGate::new(api.clone(), store);
    Ok((gate, api))
}
