//! Ambulance Tracker client library.
//!
//! Everything the driver-facing front-end needs, without any terminal I/O:
//!
//! - [`config`] - Configuration loaded from environment variables
//! - [`api`] - HTTP client for the remote tracking service
//! - [`session`] - Login (`SessionGate`) and session-token storage
//! - [`geolocation`] - Sources of the device's current coordinates
//! - [`tracking`] - The sharing state machine, status poll and location reports
//! - [`dashboard`] - Dashboard view model and command handling
//!
//! # Flow
//!
//! 1. [`session::SessionGate`] submits credentials and persists the token
//! 2. [`tracking::TrackingLoop`] starts polling the remote status
//! 3. The driver starts sharing; coordinates are reported every tick
//! 4. The driver stops sharing, or the loop is dropped and its timers cancelled

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod dashboard;
pub mod geolocation;
pub mod session;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_support;
