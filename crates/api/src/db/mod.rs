//! Persistence for orders, carts and the account/catalog directory.
//!
//! # Database: `ekart`
//!
//! ## Tables
//!
//! - `users` - Accounts (owned by the identity service; read here for roles and display fields)
//! - `products` - Catalog (owned by the catalog service; read here for display fields)
//! - `carts` - Per-user cart, reset when an order is paid
//! - `orders` - Order records with JSONB line-item and shipping snapshots
//!
//! # Seams
//!
//! Handlers and services depend on the [`OrderStore`], [`CartStore`] and
//! [`Directory`] traits. [`postgres`] implements them over a `PgPool`;
//! [`memory`] implements them over in-process maps for tests and local runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p ekart-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use ekart_core::{DailySales, Money, Order, OrderStatus, PageRequest, ProductId, UserId};

use crate::models::{Cart, CurrentUser, ProductSummary, UserSummary};

pub use memory::{MemoryCartStore, MemoryDirectory, MemoryOrderStore};
pub use postgres::{PgCartStore, PgDirectory, PgOrderStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate gateway order id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    User(UserId),
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::User(user_id) => order.user_id == *user_id,
        }
    }
}

/// One page of orders, newest first, plus the unpaginated total.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

/// Count and revenue over every paid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaidTotals {
    pub count: u64,
    pub revenue: Money,
}

/// Gateway identifiers recorded when a payment is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    pub signature: String,
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Atomically move the order correlated with `gateway_order_id` out of
    /// `Pending`. Returns `None` when no order is `Pending` under that id, in
    /// which case nothing was written.
    async fn transition_pending(
        &self,
        gateway_order_id: &str,
        to: OrderStatus,
        confirmation: Option<&PaymentConfirmation>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Orders matching `filter`, newest first.
    async fn list(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage, RepositoryError>;

    async fn paid_totals(&self) -> Result<PaidTotals, RepositoryError>;

    /// Paid revenue per UTC day since `since`, ascending, sparse.
    async fn daily_paid_sales(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailySales>, RepositoryError>;

    /// Cheap connectivity check for readiness.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Cart persistence as seen by the order flow.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Reset the user's cart to no items and a zero total.
    async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError>;

    /// The user's cart; empty when none exists.
    async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError>;
}

/// Read access to accounts and catalog records owned by other services.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn principal(&self, user_id: UserId) -> Result<Option<CurrentUser>, RepositoryError>;

    async fn user_summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, RepositoryError>;

    async fn product_summaries(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError>;

    async fn count_users(&self) -> Result<u64, RepositoryError>;

    async fn count_products(&self) -> Result<u64, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
