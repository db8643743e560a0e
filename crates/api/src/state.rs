//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::db::GuestStore;
use crate::metrics::{ApiMetrics, MetricsError};
use crate::middleware::{AdmissionChain, FixedWindowLimiter, OriginFilter};
use crate::services::auth::AuthGate;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid origin pattern: {0}")]
    OriginPattern(#[from] regex::Error),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Everything inside is built once at startup
/// and never replaced.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn GuestStore>,
    auth: AuthGate,
    origins: Arc<OriginFilter>,
    admission: AdmissionChain,
    metrics: ApiMetrics,
    started: Instant,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Admission runs the rate limiter first and the origin filter second.
    ///
    /// # Errors
    ///
    /// Returns an error if an origin pattern fails to compile or metrics
    /// cannot be registered.
    pub fn new(config: ApiConfig, store: Arc<dyn GuestStore>) -> Result<Self, StateError> {
        let origins = Arc::new(OriginFilter::new(config.allowed_origins().as_slice())?);
        let limiter = Arc::new(FixedWindowLimiter::new(&config.rate_limit));
        let admission = AdmissionChain::new().with(limiter).with(origins.clone());
        let auth = AuthGate::new(&config.auth);
        let metrics = ApiMetrics::new()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                auth,
                origins,
                admission,
                metrics,
                started: Instant::now(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get the guest store.
    #[must_use]
    pub fn store(&self) -> &dyn GuestStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthGate {
        &self.inner.auth
    }

    /// Origin allow-list, shared with the CORS layer.
    #[must_use]
    pub fn origins(&self) -> Arc<OriginFilter> {
        Arc::clone(&self.inner.origins)
    }

    #[must_use]
    pub fn admission(&self) -> &AdmissionChain {
        &self.inner.admission
    }

    #[must_use]
    pub fn metrics(&self) -> &ApiMetrics {
        &self.inner.metrics
    }

    /// Time since the state was built, in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> f64 {
        self.inner.started.elapsed().as_secs_f64()
    }
}
