//! Login credentials.

use secrecy::{ExposeSecret, SecretString};

use super::email::{Email, EmailError};

/// Errors that can occur when building [`Credentials`] from form input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// The email address is not plausible.
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
    /// The password is empty.
    #[error("password cannot be empty")]
    EmptyPassword,
}

/// Email and password as entered on the login screen.
///
/// Held only until the login request is sent. The password is wrapped in a
/// [`SecretString`] and `Debug` redacts it.
#[derive(Clone)]
pub struct Credentials {
    email: Email,
    password: SecretString,
}

impl Credentials {
    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Email`] if the email is not plausible and
    /// [`CredentialsError::EmptyPassword`] if no password was entered.
    pub fn new(email: &str, password: SecretString) -> Result<Self, CredentialsError> {
        let email = Email::parse(email)?;

        if password.expose_secret().is_empty() {
            return Err(CredentialsError::EmptyPassword);
        }

        Ok(Self { email, password })
    }

    /// The validated email address.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// The password, still wrapped.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
