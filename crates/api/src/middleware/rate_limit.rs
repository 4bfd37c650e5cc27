//! Fixed-window rate limiting middleware.
//!
//! Each guarded request increments a counter keyed by `{prefix}{identity}`.
//! Requests over the limit get a 429; every guarded response advertises
//! `x-ratelimit-limit`, `x-ratelimit-remaining` and `x-ratelimit-reset`
//! (unix milliseconds).
//!
//! The limiter fails open: when no identity can be extracted, or the counter
//! store errors, the request is passed through. Bodies larger than
//! 64 KiB are never buffered, so they pass without an identity.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody, to_bytes},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, warn};

use ekart_core::Email;

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::services::counter::{CounterStore, WindowCount};

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Largest body buffered when looking for an email field.
const MAX_BUFFERED_BODY: usize = 64 * 1024;

/// Where a request's identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Client address from proxy headers, then the socket peer.
    ClientIp,
    /// Normalised email from a trailing path segment or a JSON `email` field.
    Email,
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub resets_in: Duration,
}

impl Decision {
    /// Whole seconds until the window resets, at least 1.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.resets_in.as_secs() + u64::from(self.resets_in.subsec_nanos() > 0);
        secs.max(1)
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        let reset_at = Utc::now()
            + chrono::Duration::from_std(self.resets_in).unwrap_or(chrono::Duration::zero());
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
        headers.insert(RESET_HEADER, HeaderValue::from(reset_at.timestamp_millis()));
    }
}

/// A configured limiter for one route group.
#[derive(Clone)]
pub struct RateLimiter {
    prefix: Arc<str>,
    window: Duration,
    max: u64,
    key: KeySource,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(
        prefix: &str,
        window: Duration,
        max: u64,
        key: KeySource,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            prefix: Arc::from(prefix),
            window,
            max,
            key,
            store,
        }
    }

    /// Per-address limiter from configuration.
    #[must_use]
    pub fn per_ip(prefix: &str, config: &RateLimitConfig, store: Arc<dyn CounterStore>) -> Self {
        Self::new(prefix, config.window, config.max, KeySource::ClientIp, store)
    }

    #[must_use]
    pub const fn key_source(&self) -> KeySource {
        self.key
    }

    /// Count one request for `identity`. `None` when the store is unavailable.
    pub async fn check(&self, identity: &str) -> Option<Decision> {
        let key = format!("{}{identity}", self.prefix);
        match self.store.incr_with_window(&key, self.window).await {
            Ok(WindowCount { count, resets_in }) => Some(Decision {
                allowed: count <= self.max,
                limit: self.max,
                remaining: self.max.saturating_sub(count),
                resets_in,
            }),
            Err(e) => {
                warn!(error = %e, key = %key, "Rate limit store unavailable, allowing request");
                None
            }
        }
    }
}

/// Middleware entry point; attach with `from_fn_with_state(limiter, rate_limit)`.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let (identity, request) = match limiter.key {
        KeySource::ClientIp => (client_ip(&request).map(|ip| ip.to_string()), request),
        KeySource::Email => email_identity(request).await,
    };

    let Some(identity) = identity else {
        debug!("No rate limit identity, allowing request");
        return next.run(request).await;
    };

    let Some(decision) = limiter.check(&identity).await else {
        return next.run(request).await;
    };

    if !decision.allowed {
        warn!(identity = %identity, prefix = %limiter.prefix, "Rate limit exceeded");
        let mut response = AppError::RateLimited(decision.retry_after_secs()).into_response();
        decision.apply_headers(response.headers_mut());
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after_secs()));
        return response;
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}

/// Client address: `cf-connecting-ip`, first `x-forwarded-for` hop,
/// `x-real-ip`, then the socket peer.
pub fn client_ip(request: &Request) -> Option<IpAddr> {
    let headers = request.headers();
    let header_ip = |name: &str, first_hop: bool| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| if first_hop { s.split(',').next() } else { Some(s) })
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip", false)
        .or_else(|| header_ip("x-forwarded-for", true))
        .or_else(|| header_ip("x-real-ip", false))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// Email from the last path segment, else from a JSON body's `email` field.
/// Only bodies with a known size up to [`MAX_BUFFERED_BODY`] are buffered
/// and re-attached; anything else passes through untouched.
async fn email_identity(request: Request) -> (Option<String>, Request) {
    if let Some(email) = request
        .uri()
        .path()
        .rsplit('/')
        .next()
        .map(|segment| segment.replace("%40", "@"))
        .and_then(|segment| Email::parse(&segment).ok())
    {
        return (Some(email.into_inner()), request);
    }

    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let fits = request
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_BUFFERED_BODY as u64);
    if !is_json || !fits {
        return (None, request);
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Could not read body for rate limit identity");
            return (None, Request::from_parts(parts, Body::empty()));
        }
    };

    let email = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|value| value.get("email")?.as_str().map(str::to_owned))
        .and_then(|raw| Email::parse(&raw).ok())
        .map(Email::into_inner);

    (email, Request::from_parts(parts, Body::from(bytes)))
}
