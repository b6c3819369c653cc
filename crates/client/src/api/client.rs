//! HTTP client for the remote tracking service.

use std::time::Duration;

use ambulance_tracker_core::{Credentials, SessionToken, SharingStatus};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::auth;
use super::{ApiError, FetchResponse, StatusUpdate, TrackerApi};

const LOGIN_PATH: &str = "login";
const FETCH_PATH: &str = "fetch";
const UPDATE_STATUS_PATH: &str = "UpdateStatus";

/// reqwest-backed [`TrackerApi`].
///
/// Requests are unauthenticated; the session token is persisted by the
/// session gate but not attached to tracking calls.
#[derive(Clone, Debug)]
pub struct HttpTrackerApi {
    client: Client,
    base_url: Url,
}

impl HttpTrackerApi {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// Endpoint paths are resolved relative to `base_url`, so a base of
    /// `https://host/api` serves `https://host/api/login`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    /// The normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, ApiError> {
        auth::login(&self.client, self.endpoint(LOGIN_PATH)?, credentials).await
    }

    #[instrument(skip(self))]
    async fn fetch_status(&self) -> Result<SharingStatus, ApiError> {
        let response = self.client.get(self.endpoint(FETCH_PATH)?).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let fetched: FetchResponse = serde_json::from_str(&body)?;
        debug!(status = %fetched.status, "Status fetched");

        Ok(fetched.status)
    }

    #[instrument(skip(self), fields(status = %update.status))]
    async fn update_status(&self, update: &StatusUpdate) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.endpoint(UPDATE_STATUS_PATH)?)
            .json(update)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
