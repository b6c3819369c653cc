//! Ambulance Tracker Core - Shared types library.
//!
//! This crate provides the domain types used across all tracker components:
//! - `client` - Remote API client, session gate and tracking loop
//! - `cli` - Terminal login screen and dashboard
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no timers, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated credentials, emails, coordinates and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
