//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `PASSWORD_HASH` - SHA-256 hex digest of the staff password (optionally
//!   prefixed with `sha256:` or `0x`); may be omitted when `AUTH_DISABLED=true`
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `APP_ENV` - `development` exposes upstream error details (default: production)
//! - `AUTH_DISABLED` - `true` turns the password gate off
//! - `ALLOWED_ORIGINS` - Extra CORS origins, comma-separated; `*` is a wildcard
//! - `RATE_LIMIT_WINDOW` - Rate-limit window in milliseconds (default: 900000)
//! - `RATE_LIMIT_MAX` - Requests per window per client (default: 100)
//! - `TRUST_PROXY_HOPS` - Reverse proxies in front of the API (default: 1)
//! - `PG_POOL_MAX` - Maximum pool connections (default: 10)
//! - `PG_IDLE_TIMEOUT` - Idle connection timeout in ms (default: 30000)
//! - `PG_CONNECTION_TIMEOUT` - Connection acquire timeout in ms (default: 5000)
//! - `PG_STATEMENT_TIMEOUT` - Per-statement timeout in ms (default: 10000)
//! - `PG_SSL_REJECT_UNAUTHORIZED` - `false` skips certificate verification
//!   when production forces TLS (default: verify)
//! - `SHUTDOWN_TIMEOUT` - Drain deadline before forced exit in ms (default: 10000)
//! - `STATIC_DIR` - Directory served under `/app`
//! - `LOG_LEVEL` - Default tracing level when `RUST_LOG` is unset (default: info)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::services::auth::ExpectedHash;

/// Upper bound for any millisecond setting (one year).
const MAX_DURATION_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// Origins every deployment accepts, before `ALLOWED_ORIGINS` is merged in.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://usadba4.ru",
    "https://www.usadba4.ru",
    "https://loyalty-api.usadba4.ru",
    "http://localhost",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1",
    "http://127.0.0.1:3000",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("PASSWORD_HASH is not set and AUTH_DISABLED is not true; set one of them")]
    MissingPasswordHash,
    #[error("PASSWORD_HASH must be 64 hexadecimal characters (optionally prefixed with sha256: or 0x)")]
    InvalidPasswordHash,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Whether upstream error details may be sent to clients.
    #[must_use]
    pub const fn exposes_error_details(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Password gate configuration.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// Every `/auth` request succeeds.
    Disabled,
    /// Passwords are checked against this digest.
    Enabled(ExpectedHash),
}

impl AuthConfig {
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

/// Fixed-window rate limit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of one window.
    pub window: Duration,
    /// Requests allowed per client per window.
    pub max_requests: u32,
    /// Number of reverse proxies whose `X-Forwarded-For` entries are trusted.
    pub trusted_proxy_hops: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
            trusted_proxy_hops: 1,
        }
    }
}

/// Database pool sizing and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub statement_timeout: Duration,
    /// Verify the server certificate when TLS is forced in production.
    pub ssl_reject_unauthorized: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(10),
            ssl_reject_unauthorized: true,
        }
    }
}

/// Loyalty API configuration.
///
/// Built once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Password gate
    pub auth: AuthConfig,
    /// Additional allowed origins from `ALLOWED_ORIGINS`
    pub extra_origins: Vec<String>,
    /// Rate limiting
    pub rate_limit: RateLimitConfig,
    /// Database pool
    pub pool: PoolConfig,
    /// How long to wait for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
    /// Directory served under `/app`
    pub static_dir: Option<PathBuf>,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated the same as unset ones.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env
            .get("DATABASE_URL")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let host = env.parse_or("HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = env.parse_or("PORT", 3000_u16)?;
        let environment = env
            .get("APP_ENV")
            .map_or_else(Environment::default, |v| Environment::parse(&v));

        let auth_disabled = env
            .get("AUTH_DISABLED")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let password_hash = env
            .get("PASSWORD_HASH")
            .map(|raw| ExpectedHash::parse(&raw).ok_or(ConfigError::InvalidPasswordHash))
            .transpose()?;
        let auth = match (auth_disabled, password_hash) {
            (true, _) => AuthConfig::Disabled,
            (false, Some(hash)) => AuthConfig::Enabled(hash),
            (false, None) => return Err(ConfigError::MissingPasswordHash),
        };

        let extra_origins = env
            .get("ALLOWED_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_default();

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            window: env.millis_or("RATE_LIMIT_WINDOW", defaults.window)?,
            max_requests: env.positive_or("RATE_LIMIT_MAX", defaults.max_requests)?,
            trusted_proxy_hops: env.parse_or("TRUST_PROXY_HOPS", defaults.trusted_proxy_hops)?,
        };

        let defaults = PoolConfig::default();
        let pool = PoolConfig {
            max_connections: env.positive_or("PG_POOL_MAX", defaults.max_connections)?,
            idle_timeout: env.millis_or("PG_IDLE_TIMEOUT", defaults.idle_timeout)?,
            connect_timeout: env.millis_or("PG_CONNECTION_TIMEOUT", defaults.connect_timeout)?,
            statement_timeout: env.millis_or("PG_STATEMENT_TIMEOUT", defaults.statement_timeout)?,
            ssl_reject_unauthorized: env
                .get("PG_SSL_REJECT_UNAUTHORIZED")
                .is_none_or(|v| !v.trim().eq_ignore_ascii_case("false")),
        };

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            auth,
            extra_origins,
            rate_limit,
            pool,
            shutdown_timeout: env.millis_or("SHUTDOWN_TIMEOUT", Duration::from_secs(10))?,
            static_dir: env.get("STATIC_DIR").map(PathBuf::from),
            log_level: env.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            sentry_dsn: env.get("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Built-in origins followed by configured ones, duplicates removed.
    #[must_use]
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for origin in DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|o| (*o).to_string())
            .chain(self.extra_origins.iter().cloned())
        {
            if !merged.contains(&origin) {
                merged.push(origin);
            }
        }
        merged
    }
}

/// Split a comma-separated origin list, dropping blank entries.
fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Parse a strictly positive integer.
    fn positive_or(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        let value = self.parse_or(key, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        Ok(value)
    }

    /// Parse a duration given in milliseconds, between 1 ms and one year.
    fn millis_or(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        let millis = self.parse_or(key, default_ms)?;
        if millis == 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if millis > MAX_DURATION_MS {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must not exceed {MAX_DURATION_MS} ms"),
            ));
        }
        Ok(Duration::from_millis(millis))
    }
}
