//! Client-facing order representation.
//!
//! Field names follow the established API (`_id`, `razorpayOrderId`,
//! `products[].productId`, ...). References are either plain ids (responses
//! to mutations) or joined display records (listings).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ekart_core::{
    CurrencyCode, Money, Order, OrderId, OrderStatus, ProductId, ShippingAddress, UserId,
};

use super::product::ProductSummary;
use super::user::UserSummary;

/// A reference that may have been joined with its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Populated<I, T> {
    Id(I),
    Record(T),
    /// The referenced record no longer exists; rendered as `null`.
    Missing,
}

impl<I: Eq + std::hash::Hash + Copy, T: Clone> Populated<I, T> {
    fn join(id: I, records: &HashMap<I, T>) -> Self {
        records
            .get(&id)
            .map_or(Self::Missing, |record| Self::Record(record.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub product_id: Populated<ProductId, ProductSummary>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub user: Populated<UserId, UserSummary>,
    pub products: Vec<OrderLineView>,
    pub amount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Render with bare ids for the owner and products.
    #[must_use]
    pub fn unpopulated(order: Order) -> Self {
        let user = Populated::Id(order.user_id);
        let products = order
            .products
            .iter()
            .map(|line| OrderLineView {
                product_id: Populated::Id(line.product_id),
                quantity: line.quantity,
            })
            .collect();
        Self::assemble(order, user, products)
    }

    /// Render with owner and product display fields joined in.
    #[must_use]
    pub fn populated(
        order: Order,
        users: &HashMap<UserId, UserSummary>,
        products: &HashMap<ProductId, ProductSummary>,
    ) -> Self {
        let user = Populated::join(order.user_id, users);
        let lines = order
            .products
            .iter()
            .map(|line| OrderLineView {
                product_id: Populated::join(line.product_id, products),
                quantity: line.quantity,
            })
            .collect();
        Self::assemble(order, user, lines)
    }

    fn assemble(
        order: Order,
        user: Populated<UserId, UserSummary>,
        products: Vec<OrderLineView>,
    ) -> Self {
        Self {
            id: order.id,
            user,
            products,
            amount: order.amount,
            tax: order.tax,
            shipping: order.shipping,
            currency: order.currency,
            status: order.status,
            shipping_address: order.shipping_address,
            razorpay_order_id: order.payment.gateway_order_id,
            razorpay_payment_id: order.payment.gateway_payment_id,
            razorpay_signature: order.payment.gateway_signature,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
