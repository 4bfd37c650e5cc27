//! `PostgreSQL` implementations of the persistence traits.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use ekart_core::{
    CurrencyCode, DailySales, Email, Money, Order, OrderId, OrderLine, OrderStatus, PageRequest,
    PaymentRef, ProductId, ShippingAddress, UserId, UserRole,
};

use super::{
    CartStore, Directory, OrderFilter, OrderPage, OrderStore, PaidTotals, PaymentConfirmation,
    RepositoryError,
};
use crate::models::{Cart, CartItem, CurrentUser, ProductImage, ProductSummary, UserSummary};

macro_rules! order_columns {
    () => {
        "id, user_id, products, amount, tax, shipping, currency, status, shipping_address, \
         razorpay_order_id, razorpay_payment_id, razorpay_signature, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    products: Json<Vec<OrderLine>>,
    amount: Money,
    tax: Money,
    shipping: Money,
    currency: String,
    status: OrderStatus,
    shipping_address: Json<ShippingAddress>,
    razorpay_order_id: Option<String>,
    razorpay_payment_id: Option<String>,
    razorpay_signature: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency: CurrencyCode = row.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency on order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            products: row.products.0,
            amount: row.amount,
            tax: row.tax,
            shipping: row.shipping,
            currency,
            status: row.status,
            shipping_address: row.shipping_address.0,
            payment: PaymentRef {
                gateway_order_id: row.razorpay_order_id,
                gateway_payment_id: row.razorpay_payment_id,
                gateway_signature: row.razorpay_signature,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn count_to_u64(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {count}")))
}

/// Orders table access.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(concat!(
            "INSERT INTO orders (",
            order_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.products))
        .bind(order.amount)
        .bind(order.tax)
        .bind(order.shipping)
        .bind(order.currency.as_str())
        .bind(order.status)
        .bind(Json(&order.shipping_address))
        .bind(order.payment.gateway_order_id.as_deref())
        .bind(order.payment.gateway_payment_id.as_deref())
        .bind(order.payment.gateway_signature.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!(
                    "order with gateway id {:?} already exists",
                    order.payment.gateway_order_id
                ))
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE razorpay_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn transition_pending(
        &self,
        gateway_order_id: &str,
        to: OrderStatus,
        confirmation: Option<&PaymentConfirmation>,
    ) -> Result<Option<Order>, RepositoryError> {
        if !OrderStatus::Pending.can_transition_to(to) {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "UPDATE orders SET status = $2, ",
            "razorpay_payment_id = COALESCE($3, razorpay_payment_id), ",
            "razorpay_signature = COALESCE($4, razorpay_signature), ",
            "updated_at = NOW() ",
            "WHERE razorpay_order_id = $1 AND status = 'pending' ",
            "RETURNING ",
            order_columns!()
        ))
        .bind(gateway_order_id)
        .bind(to)
        .bind(confirmation.map(|c| c.payment_id.as_str()))
        .bind(confirmation.map(|c| c.signature.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage, RepositoryError> {
        let user_id = match filter {
            OrderFilter::All => None,
            OrderFilter::User(id) => Some(id),
        };
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ",
            "ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(i64::from(page.limit()))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderPage {
            orders: rows
                .into_iter()
                .map(Order::try_from)
                .collect::<Result<_, _>>()?,
            total: count_to_u64(total)?,
        })
    }

    async fn paid_totals(&self) -> Result<PaidTotals, RepositoryError> {
        let (count, revenue): (i64, Money) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM orders WHERE status = 'paid'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PaidTotals {
            count: count_to_u64(count)?,
            revenue,
        })
    }

    async fn daily_paid_sales(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailySales>, RepositoryError> {
        let rows: Vec<(NaiveDate, Money)> = sqlx::query_as(
            r"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day, SUM(amount)
            FROM orders
            WHERE status = 'paid' AND created_at >= $1
            GROUP BY day
            ORDER BY day
            ",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, amount)| DailySales { date, amount })
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Carts table access.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE carts SET items = '[]'::jsonb, total_price = 0, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row: Option<(Json<Vec<CartItem>>, Money)> =
            sqlx::query_as("SELECT items, total_price FROM carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map_or_else(
            || Cart::empty(user_id),
            |(items, total_price)| Cart {
                user_id,
                items: items.0,
                total_price,
            },
        ))
    }
}

/// Read-only view of the `users` and `products` tables.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_stored_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

#[async_trait]
impl Directory for PgDirectory {
    async fn principal(&self, user_id: UserId) -> Result<Option<CurrentUser>, RepositoryError> {
        let row: Option<(String, UserRole)> =
            sqlx::query_as("SELECT email, role FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((email, role)) => Ok(Some(CurrentUser {
                id: user_id,
                email: parse_stored_email(&email)?,
                role,
            })),
            None => Ok(None),
        }
    }

    async fn user_summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let rows: Vec<(UserId, String, String, String)> = sqlx::query_as(
            "SELECT id, first_name, last_name, email FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, first_name, last_name, email)| {
                Ok(UserSummary {
                    id,
                    first_name,
                    last_name,
                    email: parse_stored_email(&email)?,
                })
            })
            .collect()
    }

    async fn product_summaries(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let rows: Vec<(ProductId, String, Option<Money>, Json<Vec<ProductImage>>)> =
            sqlx::query_as(
                "SELECT id, product_name, product_price, product_img FROM products WHERE id = ANY($1)",
            )
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, product_name, product_price, images)| ProductSummary {
                id,
                product_name,
                product_price,
                product_img: images.0,
            })
            .collect())
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        count_to_u64(count)
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        count_to_u64(count)
    }
}
