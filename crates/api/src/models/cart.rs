//! Per-user cart.

use serde::{Deserialize, Serialize};

use ekart_core::{Money, ProductId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// Items staged for purchase and their cached total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub total_price: Money,
}

impl Cart {
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_price: Money::ZERO,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.total_price == Money::ZERO
    }
}
