//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::{CartStore, Directory, OrderStore};
use crate::middleware::RateLimiter;
use crate::razorpay::PaymentGateway;
use crate::services::{OrderService, TokenService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Persistence and the payment
/// gateway are held as trait objects so tests can swap in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    directory: Arc<dyn Directory>,
    order_service: OrderService,
    tokens: TokenService,
    order_limiter: RateLimiter,
}

/// Collaborators the state is assembled from.
pub struct Backends {
    pub orders: Arc<dyn OrderStore>,
    pub carts: Arc<dyn CartStore>,
    pub directory: Arc<dyn Directory>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub order_limiter: RateLimiter,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, backends: Backends) -> Self {
        let order_service = OrderService::new(
            backends.orders.clone(),
            backends.carts.clone(),
            backends.directory.clone(),
            backends.gateway,
            config.razorpay.key_secret.clone(),
            config.sales_window_days,
        );
        let tokens = TokenService::new(
            &config.jwt_secret,
            crate::services::auth::DEFAULT_TOKEN_TTL,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orders: backends.orders,
                carts: backends.carts,
                directory: backends.directory,
                order_service,
                tokens,
                order_limiter: backends.order_limiter,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn orders(&self) -> &Arc<dyn OrderStore> {
        &self.inner.orders
    }

    #[must_use]
    pub fn carts(&self) -> &Arc<dyn CartStore> {
        &self.inner.carts
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.inner.directory
    }

    #[must_use]
    pub fn order_service(&self) -> &OrderService {
        &self.inner.order_service
    }

    /// Bearer token signer/verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Per-address limiter guarding order mutations.
    #[must_use]
    pub fn order_limiter(&self) -> &RateLimiter {
        &self.inner.order_limiter
    }
}
