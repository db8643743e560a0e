//! Hotel loyalty API.
//!
//! Front-desk staff unlock the app with a shared password, look guests up
//! by phone to see their bonus balance and the loyalty tier they reach on
//! this visit, and record each checkout in an append-only ledger.
//!
//! The binary in `main.rs` wires this library to `PostgreSQL`, tracing and
//! Sentry; tests drive [`router`] directly over an in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::router;
