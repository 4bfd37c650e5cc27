//! Integration test harness for Ekart.
//!
//! [`TestContext`] assembles the real router over in-memory stores and a
//! scripted payment gateway, so the HTTP surface can be exercised without a
//! database or network access.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory suites
//! cargo test -p ekart-integration-tests
//!
//! # Postgres-backed suites (ignored by default)
//! EKART_TEST_DATABASE_URL=postgres://... cargo test -p ekart-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{self, HeaderMap, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use ekart_api::config::{ApiConfig, RateLimitConfig, RazorpayConfig, SentryConfig};
use ekart_api::db::{MemoryCartStore, MemoryDirectory, MemoryOrderStore};
use ekart_api::middleware::RateLimiter;
use ekart_api::models::{Cart, CartItem, ProductImage, ProductSummary, UserSummary};
use ekart_api::razorpay::{
    CreateGatewayOrder, GatewayOrder, PaymentGateway, RazorpayError, payment_signature,
};
use ekart_api::services::MemoryCounterStore;
use ekart_api::state::{AppState, Backends};
use ekart_core::{Email, Money, ProductId, UserId, UserRole};

pub const KEY_SECRET: &str = "rzp_test_secret_for_integration_suite";
pub const JWT_SECRET: &str = "integration-suite-jwt-secret-6f1c2e9a8b7d4c3e";

/// Gateway stand-in that opens sequential `order_test_N` ids.
#[derive(Default)]
pub struct ScriptedGateway {
    next: AtomicU64,
    failing: AtomicBool,
}

impl ScriptedGateway {
    /// Make every subsequent call fail with an API error.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_order(
        &self,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, RazorpayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RazorpayError::Api {
                status: 500,
                message: "gateway unavailable".to_owned(),
            });
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{n}"),
            amount: request.amount,
            currency: request.currency.as_str().to_owned(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_owned()),
            extra: serde_json::Map::new(),
        })
    }
}

/// A response with its body parsed as JSON (`Value::Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Router plus handles on the in-memory collaborators behind it.
pub struct TestContext {
    pub router: Router,
    pub state: AppState,
    pub orders: Arc<MemoryOrderStore>,
    pub carts: Arc<MemoryCartStore>,
    pub directory: Arc<MemoryDirectory>,
    pub gateway: Arc<ScriptedGateway>,
}

/// Configuration with test secrets and the given order rate limit.
#[must_use]
pub fn test_config(rate_limit: RateLimitConfig) -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_owned()],
        jwt_secret: SecretString::from(JWT_SECRET),
        razorpay: RazorpayConfig {
            key_id: "rzp_test_key".to_owned(),
            key_secret: SecretString::from(KEY_SECRET),
            api_base: url::Url::parse("http://127.0.0.1:9/v1").unwrap(),
        },
        rate_limit,
        sales_window_days: 30,
        sentry: SentryConfig::default(),
    }
}

impl TestContext {
    /// Context with a limit high enough that suites never trip it.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig {
            window: Duration::from_secs(60),
            max: 10_000,
        })
    }

    #[must_use]
    pub fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        let config = test_config(rate_limit);
        let orders = Arc::new(MemoryOrderStore::new());
        let carts = Arc::new(MemoryCartStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let gateway = Arc::new(ScriptedGateway::default());
        let order_limiter = RateLimiter::per_ip(
            "rl:orders:",
            &config.rate_limit,
            Arc::new(MemoryCounterStore::default()),
        );

        let state = AppState::new(
            config,
            Backends {
                orders: orders.clone(),
                carts: carts.clone(),
                directory: directory.clone(),
                gateway: gateway.clone(),
                order_limiter,
            },
        );

        Self {
            router: ekart_api::app(state.clone()),
            state,
            orders,
            carts,
            directory,
            gateway,
        }
    }

    /// Register an account and return its id and a bearer token.
    pub async fn user(&self, email: &str, role: UserRole) -> (UserId, String) {
        let id = UserId::generate();
        self.directory
            .add_user(
                UserSummary {
                    id,
                    first_name: "Test".to_owned(),
                    last_name: "User".to_owned(),
                    email: Email::parse(email).unwrap(),
                },
                role,
            )
            .await;
        let token = self.state.tokens().issue(id, role).unwrap();
        (id, token)
    }

    pub async fn product(&self, name: &str, price: Money) -> ProductId {
        let id = ProductId::generate();
        self.directory
            .add_product(ProductSummary {
                id,
                product_name: name.to_owned(),
                product_price: Some(price),
                product_img: vec![ProductImage {
                    url: format!("https://cdn.example.com/{name}.jpg"),
                    public_id: name.to_owned(),
                }],
            })
            .await;
        id
    }

    /// Put one item in the user's cart.
    pub async fn fill_cart(&self, user_id: UserId, product_id: ProductId, price: Money) {
        self.carts
            .put(Cart {
                user_id,
                items: vec![CartItem {
                    product_id,
                    quantity: 1,
                    price,
                }],
                total_price: price,
            })
            .await;
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, token, None, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.send(request("POST", uri, token, Some(body), None)).await
    }

    /// POST as if from the given client address.
    pub async fn post_from(
        &self,
        ip: &str,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        self.send(request("POST", uri, token, Some(body), Some(ip)))
            .await
    }

    pub async fn send(&self, request: http::Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&Value>,
    ip: Option<&str>,
) -> http::Request<Body> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(ip) = ip {
        builder = builder.header("x-forwarded-for", ip);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Signature the checkout widget would return for this order and payment.
#[must_use]
pub fn sign(gateway_order_id: &str, payment_id: &str) -> String {
    payment_signature(&SecretString::from(KEY_SECRET), gateway_order_id, payment_id).unwrap()
}

/// Major-unit amount from paise, e.g. `rupees(49_950)` is `499.50`.
#[must_use]
pub fn rupees(paise: i64) -> Money {
    Money::from_parts(paise, 2).unwrap()
}

/// A valid order body for one unit of `product_id`.
#[must_use]
pub fn order_body(product_id: ProductId, amount: &str) -> Value {
    serde_json::json!({
        "products": [{ "productId": product_id, "quantity": 1 }],
        "amount": amount,
        "tax": "0",
        "shipping": "0",
        "currency": "INR",
        "shippingAddress": {
            "fullName": "Asha Rao",
            "phone": "9999999999",
            "address": "12 MG Road",
            "city": "Bengaluru",
            "zip": "560001",
            "country": "India"
        }
    })
}
