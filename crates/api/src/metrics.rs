//! Prometheus metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `loyalty_api_http_request_duration_seconds` | Histogram | `method`, `route`, `status_code` |
//! | `loyalty_api_admission_denials_total` | Counter | `reason` |
//! | `loyalty_api_auth_attempts_total` | Counter | `outcome` |
//!
//! On Linux the registry also carries the standard `process_*` metrics.
//! Everything is exported in text format from `GET /metrics`.

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Request duration buckets, in seconds.
pub const HTTP_DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Metrics registry for the API process.
///
/// Cheap to clone; all clones record into the same registry.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    http_request_duration: HistogramVec,
    admission_denials_total: CounterVec,
    auth_attempts_total: CounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

impl ApiMetrics {
    /// Create a fresh registry with all API metrics registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "loyalty_api_http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(HTTP_DURATION_BUCKETS.to_vec()),
            &["method", "route", "status_code"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        let admission_denials_total = CounterVec::new(
            Opts::new(
                "loyalty_api_admission_denials_total",
                "Requests refused before routing",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(admission_denials_total.clone()))?;

        let auth_attempts_total = CounterVec::new(
            Opts::new(
                "loyalty_api_auth_attempts_total",
                "Password checks by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_attempts_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            http_request_duration,
            admission_denials_total,
            auth_attempts_total,
        })
    }

    pub fn observe_request(&self, method: &str, route: &str, status: u16, seconds: f64) {
        self.http_request_duration
            .with_label_values(&[method, route, &status.to_string()])
            .observe(seconds);
    }

    pub fn record_denial(&self, reason: &str) {
        self.admission_denials_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_auth_attempt(&self, outcome: &str) {
        self.auth_attempts_total.with_label_values(&[outcome]).inc();
    }

    /// Encode every metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Encoding` if the encoder fails.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}
