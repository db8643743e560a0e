//! Loyalty Core - Shared domain types.
//!
//! This crate provides the domain types used across the loyalty workspace:
//! - `api` - HTTP service for guest search, checkout and the password gate
//! - `cli` - Command-line tools for migrations and operator chores
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. This keeps validation rules testable in isolation and lets
//! the API and CLI agree on them.
//!
//! # Modules
//!
//! - [`types`] - Canonical phone keys, the loyalty tier ladder, check-in date
//!   normalization and checkout validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
