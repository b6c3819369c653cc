//! Login endpoint.
//!
//! Exchanges email/password for an opaque session token.

use ambulance_tracker_core::{Credentials, SessionToken};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::ApiError;

/// Request body for `POST /login`.
#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Success body from `POST /login`.
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Error body from `POST /login`.
#[derive(Deserialize)]
struct LoginErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Authenticate against the login endpoint.
///
/// # Errors
///
/// Returns `ApiError::LoginRejected` for any non-success status, carrying the
/// `message` field of the error body when one could be read.
/// Returns `ApiError::MissingToken` if a success body has no usable token.
/// Returns `ApiError::Http` if the endpoint is unreachable.
#[instrument(skip(client, credentials), fields(email = %credentials.email()))]
pub async fn login(
    client: &reqwest::Client,
    endpoint: Url,
    credentials: &Credentials,
) -> Result<SessionToken, ApiError> {
    let response = client
        .post(endpoint)
        .json(&LoginRequest {
            email: credentials.email().as_str(),
            password: credentials.password().expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        let login_response: LoginResponse =
            serde_json::from_str(&body).map_err(|_| ApiError::MissingToken)?;

        match login_response.token {
            Some(token) if !token.is_empty() => Ok(SessionToken::new(token)),
            _ => Err(ApiError::MissingToken),
        }
    } else {
        // Malformed or empty error bodies fall back to no message.
        let message = response
            .json::<LoginErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty());

        Err(ApiError::LoginRejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_shape() {
        let body = serde_json::to_value(LoginRequest {
            email: "a@b.com",
            password: "x",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"email": "a@b.com", "password": "x"}));
    }

    #[test]
    fn test_login_response_tolerates_missing_token() {
        let parsed: LoginResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.token.is_none());
    }

    #[test]
    fn test_error_response_tolerates_extra_fields() {
        let parsed: LoginErrorResponse =
            serde_json::from_str(r#"{"message": "Invalid credentials", "code": 401}"#).unwrap();
        assert_eq!(parsed.message.as_deref(), Some("Invalid credentials"));
    }
}
