//! Order lifecycle: creation, payment verification, listings and sales.
//!
//! Orders move `Pending -> Paid` or `Pending -> Failed` exactly once. Every
//! status write goes through [`OrderStore::transition_pending`], which only
//! applies while the stored status is still `Pending`, so duplicate or late
//! callbacks cannot overwrite a terminal state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use ekart_core::{
    CurrencyCode, DailySales, DraftError, Money, MoneyError, Order, OrderDraft, OrderLine,
    OrderStatus, PageRequest, ShippingAddress, page_count,
};

use crate::db::{
    CartStore, Directory, OrderFilter, OrderStore, PaymentConfirmation, RepositoryError,
};
use crate::models::{CurrentUser, OrderView};
use crate::razorpay::{
    CreateGatewayOrder, GatewayOrder, MAX_RECEIPT_LENGTH, PaymentGateway, RazorpayError,
    verify_payment_signature,
};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Rejected input; nothing was written.
    #[error(transparent)]
    Invalid(#[from] DraftError),

    /// A required request field is absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    Amount(#[from] MoneyError),

    #[error("Order not found")]
    NotFound,

    #[error("payment gateway error: {0}")]
    Gateway(#[from] RazorpayError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Order input shared by the gateway-backed and direct flows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub products: Vec<OrderLine>,
    pub amount: Money,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

impl OrderRequest {
    fn into_draft(self, user: &CurrentUser) -> Result<OrderDraft, DraftError> {
        OrderDraft::new(
            user.id,
            self.products,
            self.amount,
            self.tax,
            self.shipping,
            self.currency,
            self.shipping_address,
        )
    }
}

/// Checkout callback data, using the gateway's field names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
    /// Set by the client when checkout was abandoned or declined.
    #[serde(default)]
    pub failed: bool,
}

/// A freshly opened gateway order and its `Pending` order record.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub gateway_order: GatewayOrder,
    pub order: Order,
}

/// How a verification request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The order is `Paid`.
    Paid,
    /// The client reported failure, or the order had already failed.
    Failed,
    /// The signature did not verify.
    SignatureMismatch,
}

impl PaymentOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Paid)
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Paid => "Payment verified successfully",
            Self::Failed => "Payment failed",
            Self::SignatureMismatch => "Invalid payment signature",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub outcome: PaymentOutcome,
    pub order: Order,
}

/// One page of enriched orders.
#[derive(Debug, Clone)]
pub struct OrderListing {
    pub orders: Vec<OrderView>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_sales: Money,
    pub sales: Vec<DailySales>,
}

/// Orchestrates the order lifecycle over the persistence and gateway seams.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    directory: Arc<dyn Directory>,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: SecretString,
    sales_window: Duration,
}

impl OrderService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        directory: Arc<dyn Directory>,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: SecretString,
        sales_window_days: u32,
    ) -> Self {
        Self {
            orders,
            carts,
            directory,
            gateway,
            key_secret,
            sales_window: Duration::days(i64::from(sales_window_days)),
        }
    }

    /// Open a gateway order and persist a matching `Pending` order.
    ///
    /// # Errors
    ///
    /// Validation errors before any side effect; gateway or repository
    /// errors abort the operation.
    #[instrument(skip(self, user, request), fields(user_id = %user.id))]
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        request: OrderRequest,
    ) -> Result<CreatedOrder, OrderError> {
        let draft = request.into_draft(user)?;
        let amount = draft.amount.to_minor_units()?;
        let now = Utc::now();

        let gateway_order = self
            .gateway
            .create_order(&CreateGatewayOrder {
                amount,
                currency: draft.currency,
                receipt: receipt_id(now),
            })
            .await?;

        let order = Order::pending(draft, gateway_order.id.clone(), now);
        if let Err(e) = self.orders.insert(&order).await {
            // The gateway order stays open with nothing referencing it.
            error!(
                gateway_order_id = %gateway_order.id,
                error = %e,
                "Failed to persist order after opening gateway order"
            );
            return Err(e.into());
        }

        info!(order_id = %order.id, gateway_order_id = %gateway_order.id, "Order created");
        Ok(CreatedOrder {
            gateway_order,
            order,
        })
    }

    /// Persist an order as `Paid` without a gateway and clear the cart.
    ///
    /// Once the order is stored it is returned even if clearing the cart
    /// fails, so a retry cannot place it twice.
    ///
    /// # Errors
    ///
    /// Validation errors before any side effect; repository errors from the
    /// insert.
    #[instrument(skip(self, user, request), fields(user_id = %user.id))]
    pub async fn place_order_direct(
        &self,
        user: &CurrentUser,
        request: OrderRequest,
    ) -> Result<Order, OrderError> {
        let draft = request.into_draft(user)?;
        let order = Order::direct(draft, Utc::now());

        self.orders.insert(&order).await?;
        if let Err(e) = self.carts.clear(order.user_id).await {
            error!(order_id = %order.id, error = %e, "Failed to clear cart after direct placement");
        }

        info!(order_id = %order.id, "Order placed without gateway");
        Ok(order)
    }

    /// Settle a `Pending` order from checkout callback data.
    ///
    /// A mismatched signature is an outcome, not an error. Orders already in
    /// a terminal state keep their status.
    ///
    /// # Errors
    ///
    /// `MissingField` for absent identifiers, `NotFound` when the gateway
    /// order is unknown or owned by someone else, repository errors otherwise.
    #[instrument(
        skip(self, user, request),
        fields(user_id = %user.id, gateway_order_id = %request.razorpay_order_id)
    )]
    pub async fn verify_payment(
        &self,
        user: &CurrentUser,
        request: VerifyPaymentRequest,
    ) -> Result<Verification, OrderError> {
        let gateway_order_id = request.razorpay_order_id.trim();
        if gateway_order_id.is_empty() {
            return Err(OrderError::MissingField("razorpay_order_id"));
        }

        let existing = self
            .orders
            .find_by_gateway_order_id(gateway_order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or(OrderError::NotFound)?;

        if request.failed {
            let order = self
                .settle(gateway_order_id, OrderStatus::Failed, None, existing)
                .await?;
            let outcome = self.outcome_for(&order, PaymentOutcome::Failed).await?;
            return Ok(Verification { outcome, order });
        }

        let payment_id = required(request.razorpay_payment_id.as_deref(), "razorpay_payment_id")?;
        let signature = required(request.razorpay_signature.as_deref(), "razorpay_signature")?;

        let valid =
            verify_payment_signature(&self.key_secret, gateway_order_id, payment_id, signature)?;

        if !valid {
            warn!("Payment signature mismatch");
            let order = self
                .settle(gateway_order_id, OrderStatus::Failed, None, existing)
                .await?;
            return Ok(Verification {
                outcome: PaymentOutcome::SignatureMismatch,
                order,
            });
        }

        let confirmation = PaymentConfirmation {
            payment_id: payment_id.to_owned(),
            signature: signature.to_owned(),
        };
        let order = self
            .settle(gateway_order_id, OrderStatus::Paid, Some(&confirmation), existing)
            .await?;
        let outcome = self.outcome_for(&order, PaymentOutcome::Failed).await?;
        Ok(Verification { outcome, order })
    }

    /// Apply `to` if the order is still `Pending`; otherwise return its
    /// current (terminal) state unchanged.
    async fn settle(
        &self,
        gateway_order_id: &str,
        to: OrderStatus,
        confirmation: Option<&PaymentConfirmation>,
        existing: Order,
    ) -> Result<Order, OrderError> {
        if let Some(order) = self
            .orders
            .transition_pending(gateway_order_id, to, confirmation)
            .await?
        {
            info!(order_id = %order.id, status = %order.status, "Order settled");
            return Ok(order);
        }

        let current = self
            .orders
            .find_by_gateway_order_id(gateway_order_id)
            .await?
            .unwrap_or(existing);
        info!(
            order_id = %current.id,
            status = %current.status,
            requested = %to,
            "Order already settled"
        );
        Ok(current)
    }

    /// Paid orders clear the owner's cart (again, for repeated calls).
    async fn outcome_for(
        &self,
        order: &Order,
        otherwise: PaymentOutcome,
    ) -> Result<PaymentOutcome, OrderError> {
        if order.status == OrderStatus::Paid {
            self.carts.clear(order.user_id).await?;
            return Ok(PaymentOutcome::Paid);
        }
        Ok(otherwise)
    }

    /// Orders matching `filter`, newest first, with owner and product
    /// display fields joined in.
    ///
    /// # Errors
    ///
    /// Repository errors.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<OrderListing, OrderError> {
        let result = self.orders.list(filter, page).await?;

        let mut user_ids: Vec<_> = result.orders.iter().map(|o| o.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut product_ids: Vec<_> = result
            .orders
            .iter()
            .flat_map(|o| o.products.iter().map(|line| line.product_id))
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let users: HashMap<_, _> = self
            .directory
            .user_summaries(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let products: HashMap<_, _> = self
            .directory
            .product_summaries(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(OrderListing {
            orders: result
                .orders
                .into_iter()
                .map(|order| OrderView::populated(order, &users, &products))
                .collect(),
            total: result.total,
            page: page.page(),
            total_pages: page_count(result.total, page.limit()),
        })
    }

    /// Totals over paid orders plus a sparse daily revenue series for the
    /// trailing window.
    ///
    /// # Errors
    ///
    /// Repository errors.
    #[instrument(skip(self))]
    pub async fn sales_summary(&self) -> Result<SalesSummary, OrderError> {
        let since = Utc::now() - self.sales_window;

        let total_users = self.directory.count_users().await?;
        let total_products = self.directory.count_products().await?;
        let totals = self.orders.paid_totals().await?;
        let sales = self.orders.daily_paid_sales(since).await?;

        Ok(SalesSummary {
            total_users,
            total_products,
            total_orders: totals.count,
            total_sales: totals.revenue,
            sales,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, OrderError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(OrderError::MissingField(field))
}

/// Receipt ids are unique per request: millisecond timestamp plus a random
/// suffix, well under the gateway's length limit.
fn receipt_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let mut receipt = format!(
        "rcpt_{}_{}",
        now.timestamp_millis(),
        suffix.get(..8).unwrap_or_default()
    );
    receipt.truncate(MAX_RECEIPT_LENGTH);
    receipt
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use ekart_core::{Email, ProductId, UserId, UserRole};

    use super::*;
    use crate::db::{MemoryCartStore, MemoryDirectory, MemoryOrderStore};
    use crate::models::{Cart, CartItem};
    use crate::razorpay::payment_signature;

    const SECRET: &str = "rzp_test_key_secret";

    #[derive(Default)]
    struct FakeGateway {
        requests: Mutex<Vec<CreateGatewayOrder>>,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_order(
            &self,
            request: &CreateGatewayOrder,
        ) -> Result<GatewayOrder, RazorpayError> {
            if self.fail {
                return Err(RazorpayError::Api {
                    status: 500,
                    message: "gateway down".to_owned(),
                });
            }
            let mut requests = self.requests.lock().await;
            requests.push(request.clone());
            Ok(GatewayOrder {
                id: format!("order_test{}", requests.len()),
                amount: request.amount,
                currency: request.currency.to_string(),
                receipt: Some(request.receipt.clone()),
                status: Some("created".to_owned()),
                extra: serde_json::Map::new(),
            })
        }
    }

    struct Fixture {
        service: OrderService,
        orders: Arc<MemoryOrderStore>,
        carts: Arc<MemoryCartStore>,
        gateway: Arc<FakeGateway>,
        user: CurrentUser,
    }

    fn fixture_with(gateway: FakeGateway) -> Fixture {
        let orders = Arc::new(MemoryOrderStore::new());
        let carts = Arc::new(MemoryCartStore::new());
        let gateway = Arc::new(gateway);
        let service = OrderService::new(
            orders.clone(),
            carts.clone(),
            Arc::new(MemoryDirectory::new()),
            gateway.clone(),
            SecretString::from(SECRET.to_owned()),
            30,
        );
        Fixture {
            service,
            orders,
            carts,
            gateway,
            user: CurrentUser {
                id: UserId::generate(),
                email: Email::parse("buyer@example.in").unwrap(),
                role: UserRole::User,
            },
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeGateway::default())
    }

    fn request(amount: Money) -> OrderRequest {
        OrderRequest {
            products: vec![OrderLine {
                product_id: ProductId::generate(),
                quantity: 2,
            }],
            amount,
            tax: Money::ZERO,
            shipping: Money::ZERO,
            currency: CurrencyCode::INR,
            shipping_address: Some(ShippingAddress {
                full_name: "Asha Rao".to_owned(),
                address: "12 MG Road".to_owned(),
                ..ShippingAddress::default()
            }),
        }
    }

    async fn fill_cart(f: &Fixture) {
        f.carts
            .put(Cart {
                user_id: f.user.id,
                items: vec![CartItem {
                    product_id: ProductId::generate(),
                    quantity: 1,
                    price: Money::from_parts(1999, 2).unwrap(),
                }],
                total_price: Money::from_parts(1999, 2).unwrap(),
            })
            .await;
    }

    fn paid_request(gateway_order_id: &str) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            razorpay_order_id: gateway_order_id.to_owned(),
            razorpay_payment_id: Some("pay_123".to_owned()),
            razorpay_signature: Some(
                payment_signature(&SecretString::from(SECRET.to_owned()), gateway_order_id, "pay_123")
                    .unwrap(),
            ),
            failed: false,
        }
    }

    #[tokio::test]
    async fn test_create_order_is_pending_with_unscaled_amount() {
        let f = fixture();
        let amount = Money::from_parts(1999, 2).unwrap();

        let created = f.service.create_order(&f.user, request(amount)).await.unwrap();

        assert_eq!(created.order.status, OrderStatus::Pending);
        assert_eq!(created.order.amount, amount);
        assert_eq!(
            created.order.payment.gateway_order_id.as_deref(),
            Some(created.gateway_order.id.as_str())
        );
        let sent = f.gateway.requests.lock().await;
        assert_eq!(sent[0].amount, 1999);
        assert!(sent[0].receipt.len() <= MAX_RECEIPT_LENGTH);
    }

    #[tokio::test]
    async fn test_receipts_are_unique() {
        let f = fixture();
        for _ in 0..2 {
            f.service
                .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
                .await
                .unwrap();
        }
        let sent = f.gateway.requests.lock().await;
        assert_ne!(sent[0].receipt, sent[1].receipt);
    }

    #[tokio::test]
    async fn test_validation_runs_before_gateway() {
        let f = fixture();
        let mut bad = request(Money::ZERO);
        bad.products.clear();

        let err = f.service.create_order(&f.user, bad).await.unwrap_err();

        assert!(matches!(err, OrderError::Invalid(DraftError::EmptyProducts)));
        assert!(f.gateway.requests.lock().await.is_empty());
        assert!(f.orders.is_empty().await);
    }

    #[tokio::test]
    async fn test_gateway_failure_persists_nothing() {
        let f = fixture_with(FakeGateway {
            fail: true,
            ..FakeGateway::default()
        });

        let err = f
            .service
            .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Gateway(_)));
        assert!(f.orders.is_empty().await);
    }

    #[tokio::test]
    async fn test_place_order_direct_is_paid_and_clears_cart() {
        let f = fixture();
        fill_cart(&f).await;

        let order = f
            .service
            .place_order_direct(&f.user, request(Money::from_parts(500, 0).unwrap()))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.payment.is_empty());
        assert!(f.carts.get(f.user.id).await.unwrap().is_empty());
    }

    struct UnavailableCarts;

    #[async_trait]
    impl CartStore for UnavailableCarts {
        async fn clear(&self, _user_id: UserId) -> Result<(), RepositoryError> {
            Err(RepositoryError::DataCorruption("cart store offline".to_owned()))
        }

        async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
            Ok(Cart::empty(user_id))
        }
    }

    #[tokio::test]
    async fn test_direct_placement_survives_cart_clear_failure() {
        let f = fixture();
        let service = OrderService::new(
            f.orders.clone(),
            Arc::new(UnavailableCarts),
            Arc::new(MemoryDirectory::new()),
            f.gateway.clone(),
            SecretString::from(SECRET.to_owned()),
            30,
        );

        for attempt in 1..=2 {
            let order = service
                .place_order_direct(&f.user, request(Money::from_parts(500, 0).unwrap()))
                .await
                .unwrap();
            assert_eq!(order.status, OrderStatus::Paid);
            assert_eq!(f.orders.len().await, attempt);
        }
    }

    fn money_json(json: &str) -> Money {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_unstorable_amount_rejected_before_side_effects() {
        let f = fixture();
        fill_cart(&f).await;
        let too_large = money_json("10000000000");

        let err = f
            .service
            .place_order_direct(&f.user, request(too_large))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Invalid(DraftError::Amount(MoneyError::TooLarge(_)))
        ));

        let mut taxed = request(Money::from_parts(100, 0).unwrap());
        taxed.tax = too_large;
        let err = f.service.create_order(&f.user, taxed).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid(DraftError::Amount(_))));

        assert!(f.orders.is_empty().await);
        assert!(f.gateway.requests.lock().await.is_empty());
        assert!(!f.carts.get(f.user.id).await.unwrap().is_empty());
    }

    #[test]
    fn test_order_request_amount_and_currency_parsing() {
        let parse = |extra: &str| {
            serde_json::from_str::<OrderRequest>(&format!(
                r#"{{"products":[],"amount":19.99{extra}}}"#
            ))
        };

        assert_eq!(parse("").unwrap().currency, CurrencyCode::INR);
        assert_eq!(parse(r#","currency":null"#).unwrap().currency, CurrencyCode::INR);
        assert_eq!(parse(r#","currency":"""#).unwrap().currency, CurrencyCode::INR);
        assert_eq!(parse(r#","currency":"usd""#).unwrap().currency, CurrencyCode::USD);
        assert!(parse(r#","currency":"XYZ""#).is_err());

        let sub_cent = serde_json::from_str::<OrderRequest>(r#"{"products":[],"amount":19.999}"#);
        assert!(sub_cent.is_err());
    }

    #[tokio::test]
    async fn test_valid_signature_pays_and_clears_cart() {
        let f = fixture();
        fill_cart(&f).await;
        let created = f
            .service
            .create_order(&f.user, request(Money::from_parts(1999, 2).unwrap()))
            .await
            .unwrap();

        let verification = f
            .service
            .verify_payment(&f.user, paid_request(&created.gateway_order.id))
            .await
            .unwrap();

        assert_eq!(verification.outcome, PaymentOutcome::Paid);
        assert_eq!(verification.order.status, OrderStatus::Paid);
        assert_eq!(verification.order.payment.gateway_payment_id.as_deref(), Some("pay_123"));
        assert!(f.carts.get(f.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_signature_fails_and_keeps_cart() {
        let f = fixture();
        fill_cart(&f).await;
        let created = f
            .service
            .create_order(&f.user, request(Money::from_parts(1999, 2).unwrap()))
            .await
            .unwrap();

        let mut tampered = paid_request(&created.gateway_order.id);
        tampered.razorpay_signature = Some("deadbeef".to_owned());
        let verification = f.service.verify_payment(&f.user, tampered).await.unwrap();

        assert_eq!(verification.outcome, PaymentOutcome::SignatureMismatch);
        assert_eq!(verification.order.status, OrderStatus::Failed);
        assert!(!f.carts.get(f.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_valid_verification_is_idempotent() {
        let f = fixture();
        let created = f
            .service
            .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
            .await
            .unwrap();
        let id = created.gateway_order.id;

        f.service.verify_payment(&f.user, paid_request(&id)).await.unwrap();
        fill_cart(&f).await;
        let second = f.service.verify_payment(&f.user, paid_request(&id)).await.unwrap();

        assert_eq!(second.outcome, PaymentOutcome::Paid);
        assert_eq!(second.order.status, OrderStatus::Paid);
        assert!(f.carts.get(f.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_states_are_sticky() {
        let f = fixture();
        let paid = f
            .service
            .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
            .await
            .unwrap()
            .gateway_order
            .id;
        f.service.verify_payment(&f.user, paid_request(&paid)).await.unwrap();

        let late_failure = VerifyPaymentRequest {
            razorpay_order_id: paid.clone(),
            failed: true,
            ..VerifyPaymentRequest::default()
        };
        let after = f.service.verify_payment(&f.user, late_failure).await.unwrap();
        assert_eq!(after.order.status, OrderStatus::Paid);

        let failed = f
            .service
            .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
            .await
            .unwrap()
            .gateway_order
            .id;
        let flagged = VerifyPaymentRequest {
            razorpay_order_id: failed.clone(),
            failed: true,
            ..VerifyPaymentRequest::default()
        };
        let first = f.service.verify_payment(&f.user, flagged).await.unwrap();
        assert_eq!(first.outcome, PaymentOutcome::Failed);

        let replay = f.service.verify_payment(&f.user, paid_request(&failed)).await.unwrap();
        assert_eq!(replay.outcome, PaymentOutcome::Failed);
        assert_eq!(replay.order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_verify_requires_owner() {
        let f = fixture();
        let id = f
            .service
            .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
            .await
            .unwrap()
            .gateway_order
            .id;
        let stranger = CurrentUser {
            id: UserId::generate(),
            ..f.user.clone()
        };

        let err = f
            .service
            .verify_payment(&stranger, paid_request(&id))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound));
    }

    #[tokio::test]
    async fn test_verify_requires_payment_fields() {
        let f = fixture();
        let id = f
            .service
            .create_order(&f.user, request(Money::from_parts(100, 0).unwrap()))
            .await
            .unwrap()
            .gateway_order
            .id;

        let err = f
            .service
            .verify_payment(
                &f.user,
                VerifyPaymentRequest {
                    razorpay_order_id: id,
                    ..VerifyPaymentRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::MissingField("razorpay_payment_id")));
    }

    #[tokio::test]
    async fn test_sales_summary_counts_only_paid() {
        let f = fixture();
        let day = Utc::now() - Duration::days(1);
        for (amount, paid) in [(100, true), (200, true), (50, true), (500, false)] {
            let draft = request(Money::from_parts(amount, 0).unwrap())
                .into_draft(&f.user)
                .unwrap();
            let order = if paid {
                Order::direct(draft, day)
            } else {
                Order::pending(draft, format!("order_p{amount}"), day)
            };
            f.orders.insert(&order).await.unwrap();
        }

        let summary = f.service.sales_summary().await.unwrap();

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_sales, Money::from_parts(350, 0).unwrap());
        assert_eq!(
            summary.sales,
            vec![DailySales {
                date: day.date_naive(),
                amount: Money::from_parts(350, 0).unwrap(),
            }]
        );
    }

    #[tokio::test]
    async fn test_sales_summary_overflow_is_an_error() {
        let f = fixture();
        let huge = money_json("\"79228162514264337593543950335\"");
        for _ in 0..2 {
            let draft = request(Money::from_parts(1, 0).unwrap())
                .into_draft(&f.user)
                .unwrap();
            let mut order = Order::direct(draft, Utc::now());
            order.amount = huge;
            f.orders.insert(&order).await.unwrap();
        }

        let err = f.service.sales_summary().await.unwrap_err();

        assert!(matches!(
            err,
            OrderError::Repository(RepositoryError::DataCorruption(_))
        ));
    }

    #[tokio::test]
    async fn test_my_orders_paginate_newest_first() {
        let f = fixture();
        let now = Utc::now();
        for i in 0..45 {
            let draft = request(Money::from_parts(100, 0).unwrap())
                .into_draft(&f.user)
                .unwrap();
            f.orders
                .insert(&Order::direct(draft, now - Duration::minutes(i)))
                .await
                .unwrap();
        }

        let first = f
            .service
            .list_orders(OrderFilter::User(f.user.id), PageRequest::new(1, 30))
            .await
            .unwrap();
        let second = f
            .service
            .list_orders(OrderFilter::User(f.user.id), PageRequest::new(2, 30))
            .await
            .unwrap();

        assert_eq!(first.orders.len(), 30);
        assert_eq!(second.orders.len(), 15);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.total, 45);
        assert!(
            first
                .orders
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at)
        );
        assert!(first.orders[29].created_at >= second.orders[0].created_at);
    }

    #[test]
    fn test_receipt_id_shape() {
        let receipt = receipt_id(Utc::now());
        assert!(receipt.starts_with("rcpt_"));
        assert!(receipt.len() <= MAX_RECEIPT_LENGTH);
    }
}
