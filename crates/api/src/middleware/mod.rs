//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS
//! 3. `TraceLayer` (request span with `request_id`/`user_id` fields)
//! 4. Request ID (add unique ID to each request)
//! 5. Rate limiting (order mutation routes only, fixed window)
//!
//! Authentication is per handler via the [`RequireAuth`] and [`RequireAdmin`]
//! extractors.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth};
pub use cors::cors_layer;
pub use rate_limit::{KeySource, RateLimiter, rate_limit};
pub use request_id::{RequestId, request_id_middleware};
