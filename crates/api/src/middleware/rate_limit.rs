//! Fixed-window rate limiting keyed by client IP.
//!
//! Each client gets a window that opens with its first request and lasts
//! `RATE_LIMIT_WINDOW`. Up to `RATE_LIMIT_MAX` requests are admitted inside
//! it; the rest are refused until the window has fully elapsed, at which
//! point the next request opens a fresh one.
//!
//! Per-client state lives in a `moka` cache so idle clients are evicted
//! after one window and the map cannot grow without bound.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use moka::sync::Cache;

use super::admission::{AdmissionCheck, Denial, RequestMeta, Verdict};
use crate::config::RateLimitConfig;

/// Upper bound on tracked clients.
const MAX_TRACKED_CLIENTS: u64 = 100_000;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-client fixed-window counter.
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    windows: Cache<IpAddr, Arc<Mutex<Window>>>,
    window: Duration,
    max_requests: u32,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let windows = Cache::builder()
            .max_capacity(MAX_TRACKED_CLIENTS)
            .time_to_idle(config.window)
            .build();

        Self {
            windows,
            window: config.window,
            max_requests: config.max_requests,
        }
    }

    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count a request from `client` arriving at `now`.
    ///
    /// Returns the number of requests left in the window, or how long the
    /// client must wait before the window resets.
    ///
    /// # Errors
    ///
    /// Returns the remaining window time if the client is over its limit.
    pub fn check_at(&self, client: IpAddr, now: Instant) -> Result<u32, Duration> {
        let entry = self.windows.get_with(client, || {
            Arc::new(Mutex::new(Window {
                started: now,
                count: 0,
            }))
        });
        let mut window = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(window.started);
            return Err(self.window.saturating_sub(elapsed));
        }

        window.count += 1;
        Ok(self.max_requests - window.count)
    }
}

impl AdmissionCheck for FixedWindowLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn check(&self, meta: &RequestMeta) -> Verdict {
        match self.check_at(meta.client, meta.now) {
            Ok(_) => Verdict::Allow,
            Err(retry_after) => Verdict::Deny(Denial::RateLimited {
                retry_after,
                limit: self.max_requests,
            }),
        }
    }
}

/// Resolve the client address behind `trusted_hops` reverse proxies.
///
/// The candidate list is every `X-Forwarded-For` entry, in order, followed
/// by the socket peer. The client is the entry `trusted_hops` positions from
/// the right, clamped to the leftmost entry. Entries that are not IP
/// addresses are skipped. A missing peer counts as `0.0.0.0`.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted_hops: usize) -> IpAddr {
    let peer = peer.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if trusted_hops == 0 {
        return peer.to_canonical();
    }

    let mut chain: Vec<IpAddr> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
        .collect();
    chain.push(peer);

    let index = chain.len().saturating_sub(1).saturating_sub(trusted_hops);
    chain.get(index).copied().unwrap_or(peer).to_canonical()
}
