//! Rate limiting of order mutations.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use ekart_api::config::RateLimitConfig;
use ekart_core::UserRole;
use ekart_integration_tests::{TestContext, order_body, rupees};

fn limited_context() -> TestContext {
    TestContext::with_rate_limit(RateLimitConfig {
        window: Duration::from_secs(60),
        max: 3,
    })
}

#[tokio::test]
async fn test_order_mutations_limited_per_address() {
    let ctx = limited_context();
    let (_, token) = ctx.user("buyer@example.com", UserRole::User).await;
    let product = ctx.product("mug", rupees(100)).await;
    let body = order_body(product, "1");

    for expected_remaining in ["2", "1", "0"] {
        let resp = ctx
            .post_from("203.0.113.7", "/api/orders/create-order", Some(&token), &body)
            .await;
        assert_eq!(resp.status, 201);
        assert_eq!(resp.headers["x-ratelimit-limit"], "3");
        assert_eq!(resp.headers["x-ratelimit-remaining"], expected_remaining);
        assert!(resp.headers.contains_key("x-ratelimit-reset"));
    }

    let rejected = ctx
        .post_from("203.0.113.7", "/api/orders/place-order", Some(&token), &body)
        .await;
    assert_eq!(rejected.status, 429);
    assert_eq!(rejected.body["success"], false);
    assert!(
        rejected.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Too many requests. Try again after ")
    );
    assert!(rejected.headers.contains_key("retry-after"));
    // Rejected before the handler ran.
    assert_eq!(ctx.orders.len().await, 3);

    let other_client = ctx
        .post_from("198.51.100.2", "/api/orders/create-order", Some(&token), &body)
        .await;
    assert_eq!(other_client.status, 201);
}

#[tokio::test]
async fn test_reads_are_not_limited() {
    let ctx = limited_context();
    let (_, token) = ctx.user("buyer@example.com", UserRole::User).await;

    for _ in 0..5 {
        let resp = ctx.get("/api/orders/myorder", Some(&token)).await;
        assert_eq!(resp.status, 200);
        assert!(!resp.headers.contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn test_rejected_requests_still_count() {
    let ctx = limited_context();
    let product = ctx.product("mug", rupees(100)).await;
    let body = order_body(product, "1");

    // Unauthenticated calls are counted before auth runs.
    for _ in 0..3 {
        let resp = ctx
            .post_from("203.0.113.9", "/api/orders/create-order", None, &body)
            .await;
        assert_eq!(resp.status, 401);
    }
    let resp = ctx
        .post_from("203.0.113.9", "/api/orders/create-order", None, &body)
        .await;
    assert_eq!(resp.status, 429);
}
