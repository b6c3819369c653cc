//! Core types for the ambulance tracker.
//!
//! This module provides type-safe wrappers for the tracker's domain concepts.

pub mod coordinates;
pub mod credentials;
pub mod email;
pub mod status;
pub mod token;

pub use coordinates::Coordinates;
pub use credentials::{Credentials, CredentialsError};
pub use email::{Email, EmailError};
pub use status::*;
pub use token::SessionToken;
