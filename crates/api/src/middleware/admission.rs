//! Request admission.
//!
//! Every request passes through an ordered list of [`AdmissionCheck`]s
//! before it reaches a route. The first check that denies wins and the
//! request is answered from here; later checks are not consulted.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::ORIGIN,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::rate_limit::client_ip;
use crate::error::AppError;
use crate::state::AppState;

/// What a check needs to know about a request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// `Origin` header, if present and valid UTF-8.
    pub origin: Option<String>,
    /// Client address after proxy-hop resolution.
    pub client: IpAddr,
    /// Arrival time.
    pub now: Instant,
}

#[cfg(test)]
impl RequestMeta {
    pub(crate) fn for_test(origin: Option<&str>) -> Self {
        Self {
            origin: origin.map(str::to_string),
            client: IpAddr::from([127, 0, 0, 1]),
            now: Instant::now(),
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The `Origin` header is not on the allow-list.
    OriginRejected { origin: String },
    /// The client used up its window.
    RateLimited { retry_after: Duration, limit: u32 },
}

impl Denial {
    /// Metrics label for this denial.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::OriginRejected { .. } => "origin",
            Self::RateLimited { .. } => "rate_limit",
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::OriginRejected { origin } => Self::OriginRejected(origin),
            Denial::RateLimited { retry_after, limit } => Self::RateLimited { retry_after, limit },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

/// A single admission rule.
pub trait AdmissionCheck: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn check(&self, meta: &RequestMeta) -> Verdict;
}

/// Ordered admission checks.
#[derive(Clone, Default)]
pub struct AdmissionChain {
    checks: Vec<Arc<dyn AdmissionCheck>>,
}

impl std::fmt::Debug for AdmissionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|c| c.name()))
            .finish()
    }
}

impl AdmissionChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check; checks run in insertion order.
    #[must_use]
    pub fn with(mut self, check: Arc<dyn AdmissionCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Run the checks until one denies.
    ///
    /// # Errors
    ///
    /// Returns the name of the denying check and its reason.
    pub fn evaluate(&self, meta: &RequestMeta) -> Result<(), (&'static str, Denial)> {
        for check in &self.checks {
            if let Verdict::Deny(denial) = check.check(meta) {
                return Err((check.name(), denial));
            }
        }
        Ok(())
    }
}

/// Middleware that runs the admission chain in front of every route.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let meta = RequestMeta {
        origin: request
            .headers()
            .get(ORIGIN)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
        client: client_ip(
            request.headers(),
            peer,
            state.config().rate_limit.trusted_proxy_hops,
        ),
        now: Instant::now(),
    };

    match state.admission().evaluate(&meta) {
        Ok(()) => next.run(request).await,
        Err((check, denial)) => {
            tracing::warn!(
                check,
                client = %meta.client,
                origin = meta.origin.as_deref().unwrap_or(""),
                path = %request.uri().path(),
                "Request refused"
            );
            state.metrics().record_denial(denial.reason());
            AppError::from(denial).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Verdict);

    impl AdmissionCheck for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn check(&self, _meta: &RequestMeta) -> Verdict {
            self.1.clone()
        }
    }

    fn rejected() -> Verdict {
        Verdict::Deny(Denial::OriginRejected {
            origin: "https://evil.com".to_string(),
        })
    }

    fn limited() -> Verdict {
        Verdict::Deny(Denial::RateLimited {
            retry_after: Duration::from_secs(5),
            limit: 2,
        })
    }

    #[test]
    fn test_empty_chain_allows() {
        let chain = AdmissionChain::new();
        assert!(chain.evaluate(&RequestMeta::for_test(None)).is_ok());
    }

    #[test]
    fn test_first_denial_wins() {
        let chain = AdmissionChain::new()
            .with(Arc::new(Fixed("allow", Verdict::Allow)))
            .with(Arc::new(Fixed("rate_limit", limited())))
            .with(Arc::new(Fixed("origin", rejected())));

        let (name, denial) = chain
            .evaluate(&RequestMeta::for_test(None))
            .unwrap_err();
        assert_eq!(name, "rate_limit");
        assert_eq!(denial.reason(), "rate_limit");
    }

    #[test]
    fn test_debug_lists_check_names() {
        let chain = AdmissionChain::new()
            .with(Arc::new(Fixed("rate_limit", Verdict::Allow)))
            .with(Arc::new(Fixed("origin", Verdict::Allow)));
        assert_eq!(format!("{chain:?}"), r#"["rate_limit", "origin"]"#);
    }
}
