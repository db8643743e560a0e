//! Business services.
//!
//! - [`auth`] - Shared-password gate and constant-time hash comparison

pub mod auth;
