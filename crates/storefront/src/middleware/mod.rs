//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction naming)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (fill the span field, tag Sentry, echo the header)
//! 4. Security headers (CSP, framing, isolation)
//! 5. Session layer (tower-sessions, `PostgreSQL` or in-memory store)
//! 6. Rate limiting on credential submissions (governor)
//!
//! Extractors in [`auth`] then build the per-request session context.

pub mod auth;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{CurrentSession, RequireSeller};
pub use flash::{flash_error, flash_success, take_flashes};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
