//! Login and session-token persistence.
//!
//! [`SessionGate`] owns the login flow: validate the form input, submit it
//! to the login endpoint once, and persist the token on success. Failures
//! never persist anything and are reported as a user-facing message.

pub mod store;

pub use store::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore, TokenStoreError};

use std::sync::Arc;

use ambulance_tracker_core::{Credentials, SessionToken};
use secrecy::SecretString;
use tracing::{error, info, warn};

use crate::api::{ApiError, TrackerApi};

/// Shown when the login endpoint gives no usable error message.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Token persisted; the caller should switch to the tracking view.
    Authenticated,
    /// Stay on the login view and show `message` inline.
    Rejected {
        /// User-facing error message.
        message: String,
    },
}

impl LoginOutcome {
    /// Returns `true` for [`LoginOutcome::Authenticated`].
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Credential submission and token persistence.
#[derive(Clone)]
pub struct SessionGate {
    api: Arc<dyn TrackerApi>,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate").finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Create a gate that logs in through `api` and persists into `store`.
    #[must_use]
    pub fn new(api: Arc<dyn TrackerApi>, store: Arc<dyn TokenStore>) -> Self {
        Self { api, store }
    }

    /// Validate raw form input and log in.
    ///
    /// Invalid input is rejected locally with the validation message and no
    /// request is sent.
    pub async fn submit(&self, email: &str, password: SecretString) -> LoginOutcome {
        match Credentials::new(email, password) {
            Ok(credentials) => self.login(&credentials).await,
            Err(e) => {
                warn!(error = %e, "Login form rejected");
                LoginOutcome::Rejected {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Send `credentials` to the login endpoint and persist the token.
    ///
    /// No retry is attempted; the caller must resubmit.
    pub async fn login(&self, credentials: &Credentials) -> LoginOutcome {
        let token = match self.api.login(credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, email = %credentials.email(), "Login failed");
                return LoginOutcome::Rejected {
                    message: rejection_message(e),
                };
            }
        };

        if let Err(e) = self.store.save(&token) {
            error!(error = %e, "Failed to persist session token");
            return LoginOutcome::Rejected {
                message: LOGIN_FAILED_MESSAGE.to_string(),
            };
        }

        info!(email = %credentials.email(), "Login successful");
        LoginOutcome::Authenticated
    }

    /// The persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    pub fn current_token(&self) -> Result<Option<SessionToken>, TokenStoreError> {
        self.store.load()
    }

    /// Delete the persisted token. Returns `true` if one was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be written.
    pub fn logout(&self) -> Result<bool, TokenStoreError> {
        let removed = self.store.clear()?;
        info!(removed, "Logged out");
        Ok(removed)
    }
}

/// The endpoint's own message when it sent one, otherwise the fallback.
fn rejection_message(error: ApiError) -> String {
    match error {
        ApiError::LoginRejected {
            message: Some(message),
            ..
        } => message,
        _ => LOGIN_FAILED_MESSAGE.to_string(),
    }
}
