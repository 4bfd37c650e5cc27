//! CORS layer for the configured browser origins.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

use super::rate_limit::{LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER};
use super::request_id::REQUEST_ID_HEADER;

/// Allow the configured origins to call the API with bearer tokens.
///
/// Unparseable origins are skipped. Rate-limit and request-id headers are
/// exposed so browser clients can read them.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            LIMIT_HEADER,
            REMAINING_HEADER,
            RESET_HEADER,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(600))
}
