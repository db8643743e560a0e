//! Guest record persistence.
//!
//! # Tables
//!
//! - `guests` - Append-only checkout ledger, one row per recorded stay
//! - `bonuses_balance` - Bonus balances, read-only from this service
//!
//! # Migrations
//!
//! Migrations are stored in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p loyalty-cli -- migrate
//! ```

pub mod guests;
#[cfg(any(test, feature = "memory-store"))]
pub mod memory;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use thiserror::Error;

use loyalty_core::{CanonicalPhone, NewCheckout};

use crate::config::{Environment, PoolConfig};
use crate::models::{BalanceRecord, CheckoutRecord};

pub use guests::PgGuestStore;
#[cfg(any(test, feature = "memory-store"))]
pub use memory::MemoryGuestStore;

/// Maximum rows returned by the listing endpoints.
pub const LIST_LIMIT: i64 = 100;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The statement did not finish within the configured timeout.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The store cannot serve requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations the HTTP layer depends on.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Append a checkout to the ledger and return the stored row.
    async fn insert_checkout(
        &self,
        checkout: &NewCheckout,
    ) -> Result<CheckoutRecord, RepositoryError>;

    /// Most recent balance row for a phone, by last visit date.
    async fn find_latest_balance(
        &self,
        phone: &CanonicalPhone,
    ) -> Result<Option<BalanceRecord>, RepositoryError>;

    /// Newest checkouts first.
    async fn recent_checkouts(&self, limit: i64) -> Result<Vec<CheckoutRecord>, RepositoryError>;

    /// Balance rows with the most recent visits first.
    async fn recent_balances(&self, limit: i64) -> Result<Vec<BalanceRecord>, RepositoryError>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Release connections during shutdown.
    async fn close(&self);
}

/// Create a `PostgreSQL` connection pool.
///
/// The pool connects lazily, so an unreachable database surfaces through
/// `/health` and failed requests instead of aborting startup. Every
/// connection runs with `statement_timeout` set server-side.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `config` - Pool sizing, timeouts and certificate policy
/// * `environment` - Production forces TLS unless the URL sets `sslmode`
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_pool(
    database_url: &SecretString,
    config: &PoolConfig,
    environment: Environment,
) -> Result<PgPool, sqlx::Error> {
    let url = database_url.expose_secret();
    let mut options = PgConnectOptions::from_str(url)?.options([(
        "statement_timeout",
        config.statement_timeout.as_millis().to_string(),
    )]);
    if let Some(mode) = forced_ssl_mode(environment, url, config.ssl_reject_unauthorized) {
        options = options.ssl_mode(mode);
    }

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.connect_timeout)
        .connect_lazy_with(options))
}

/// TLS mode imposed on top of the connection string, if any.
///
/// Production connections must be encrypted, and the certificate is checked
/// unless `verify` is off. An explicit `sslmode` in the URL always wins.
fn forced_ssl_mode(environment: Environment, url: &str, verify: bool) -> Option<PgSslMode> {
    if environment != Environment::Production || url_sets_ssl_mode(url) {
        return None;
    }
    Some(if verify {
        PgSslMode::VerifyFull
    } else {
        PgSslMode::Require
    })
}

fn url_sets_ssl_mode(url: &str) -> bool {
    url.split_once('?').is_some_and(|(_, query)| {
        query
            .split('&')
            .any(|pair| pair.split('=').next().is_some_and(|key| key.eq_ignore_ascii_case("sslmode")))
    })
}
