//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. Request metrics (duration histogram)
//! 5. Security headers
//! 6. Admission (rate limit, then origin)
//! 7. CORS

pub mod admission;
pub mod metrics;
pub mod origin;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use admission::{AdmissionChain, AdmissionCheck, Denial, RequestMeta, Verdict, admission_middleware};
pub use metrics::track_metrics;
pub use origin::OriginFilter;
pub use rate_limit::{FixedWindowLimiter, client_ip};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
