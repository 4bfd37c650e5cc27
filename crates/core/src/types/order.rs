//! Order records and the validated input used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::{AddressError, ShippingAddress};
use super::id::{OrderId, ProductId, UserId};
use super::money::{CurrencyCode, Money, MoneyError};
use super::status::OrderStatus;

/// Upper bound on distinct line items in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// One line item: a product reference and how many were bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Correlation identifiers with the payment gateway.
///
/// Filled progressively: the gateway order id at creation, the payment id
/// and signature once a payment is verified. Empty for direct placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentRef {
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
}

impl PaymentRef {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateway_order_id.is_none()
            && self.gateway_payment_id.is_none()
            && self.gateway_signature.is_none()
    }
}

/// Why an order request was rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("No products in order")]
    EmptyProducts,
    #[error("Too many products in order (max {max})")]
    TooManyProducts { max: usize },
    #[error("Quantity for product {0} must be at least 1")]
    ZeroQuantity(ProductId),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Amount(#[from] MoneyError),
}

/// Validated order input, shared by the gateway and direct placement flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub products: Vec<OrderLine>,
    pub amount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub currency: CurrencyCode,
    pub shipping_address: ShippingAddress,
}

impl OrderDraft {
    /// Validate raw order input. Checks run in a fixed order and the first
    /// violation wins: shipping address, the product list, then amounts.
    ///
    /// # Errors
    ///
    /// Returns a [`DraftError`] describing the violation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        products: Vec<OrderLine>,
        amount: Money,
        tax: Money,
        shipping: Money,
        currency: CurrencyCode,
        shipping_address: Option<ShippingAddress>,
    ) -> Result<Self, DraftError> {
        let shipping_address = shipping_address.ok_or(AddressError::Missing)?.validated()?;

        if products.is_empty() {
            return Err(DraftError::EmptyProducts);
        }
        if products.len() > MAX_ORDER_LINES {
            return Err(DraftError::TooManyProducts {
                max: MAX_ORDER_LINES,
            });
        }
        if let Some(line) = products.iter().find(|line| line.quantity == 0) {
            return Err(DraftError::ZeroQuantity(line.product_id));
        }

        Ok(Self {
            user_id,
            products,
            amount: amount.storable()?,
            tax: tax.storable()?,
            shipping: shipping.storable()?,
            currency,
            shipping_address,
        })
    }
}

/// A persisted purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub products: Vec<OrderLine>,
    /// Gateway-charged total in major units.
    pub amount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A `Pending` order correlated with a freshly opened gateway intent.
    #[must_use]
    pub fn pending(draft: OrderDraft, gateway_order_id: String, now: DateTime<Utc>) -> Self {
        Self::from_draft(
            draft,
            OrderStatus::Pending,
            PaymentRef {
                gateway_order_id: Some(gateway_order_id),
                ..PaymentRef::default()
            },
            now,
        )
    }

    /// A `Paid` order placed without a gateway; carries no gateway fields.
    #[must_use]
    pub fn direct(draft: OrderDraft, now: DateTime<Utc>) -> Self {
        Self::from_draft(draft, OrderStatus::Paid, PaymentRef::default(), now)
    }

    fn from_draft(
        draft: OrderDraft,
        status: OrderStatus,
        payment: PaymentRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            user_id: draft.user_id,
            products: draft.products,
            amount: draft.amount,
            tax: draft.tax,
            shipping: draft.shipping,
            currency: draft.currency,
            status,
            shipping_address: draft.shipping_address,
            payment,
            created_at: now,
            updated_at: now,
        }
    }
}
