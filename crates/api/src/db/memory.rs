//! In-process implementations of the persistence traits.
//!
//! Used by tests and by local runs without a database. Each store guards its
//! map with a single `RwLock`, so conditional updates are atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use ekart_core::{
    DailySales, Money, Order, OrderId, OrderStatus, PageRequest, ProductId, UserId, UserRole,
    daily_series,
};

use super::{
    CartStore, Directory, OrderFilter, OrderPage, OrderStore, PaidTotals, PaymentConfirmation,
    RepositoryError,
};
use crate::models::{Cart, CurrentUser, ProductSummary, UserSummary};

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if let Some(gateway_id) = order.payment.gateway_order_id.as_deref()
            && orders
                .values()
                .any(|o| o.payment.gateway_order_id.as_deref() == Some(gateway_id))
        {
            return Err(RepositoryError::Conflict(format!(
                "order with gateway id {gateway_id} already exists"
            )));
        }
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.payment.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn transition_pending(
        &self,
        gateway_order_id: &str,
        to: OrderStatus,
        confirmation: Option<&PaymentConfirmation>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.values_mut().find(|o| {
            o.status.can_transition_to(to)
                && o.payment.gateway_order_id.as_deref() == Some(gateway_order_id)
        }) else {
            return Ok(None);
        };

        order.status = to;
        if let Some(confirmation) = confirmation {
            order.payment.gateway_payment_id = Some(confirmation.payment_id.clone());
            order.payment.gateway_signature = Some(confirmation.signature.clone());
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn list(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<&Order> = orders.values().filter(|o| filter.matches(o)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = page.limit() as usize;

        Ok(OrderPage {
            orders: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
            total,
        })
    }

    async fn paid_totals(&self) -> Result<PaidTotals, RepositoryError> {
        let orders = self.orders.read().await;
        let paid: Vec<Money> = orders
            .values()
            .filter(|o| o.status == OrderStatus::Paid)
            .map(|o| o.amount)
            .collect();
        let revenue = Money::checked_sum(paid.iter().copied())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        Ok(PaidTotals {
            count: paid.len() as u64,
            revenue,
        })
    }

    async fn daily_paid_sales(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailySales>, RepositoryError> {
        daily_series(self.orders.read().await.values(), since)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCartStore {
    carts: RwLock<HashMap<UserId, Cart>>,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's cart.
    pub async fn put(&self, cart: Cart) {
        self.carts.write().await.insert(cart.user_id, cart);
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        if let Some(cart) = self.carts.write().await.get_mut(&user_id) {
            cart.items.clear();
            cart.total_price = Money::ZERO;
        }
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        Ok(self
            .carts
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, (UserSummary, UserRole)>>,
    products: RwLock<HashMap<ProductId, ProductSummary>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: UserSummary, role: UserRole) {
        self.users.write().await.insert(user.id, (user, role));
    }

    pub async fn add_product(&self, product: ProductSummary) {
        self.products.write().await.insert(product.id, product);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn principal(&self, user_id: UserId) -> Result<Option<CurrentUser>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .map(|(user, role)| CurrentUser {
                id: user.id,
                email: user.email.clone(),
                role: *role,
            }))
    }

    async fn user_summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, RepositoryError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|(user, _)| user.clone()))
            .collect())
    }

    async fn product_summaries(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        Ok(self.products.read().await.len() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use ekart_core::{CurrencyCode, OrderDraft, OrderLine, ShippingAddress};

    use super::*;

    fn pending(user_id: UserId, gateway_id: &str, created_at: DateTime<Utc>) -> Order {
        let draft = OrderDraft::new(
            user_id,
            vec![OrderLine {
                product_id: ProductId::generate(),
                quantity: 1,
            }],
            Money::from_parts(100, 0).unwrap(),
            Money::ZERO,
            Money::ZERO,
            CurrencyCode::INR,
            Some(ShippingAddress {
                full_name: "Asha Rao".to_owned(),
                address: "12 MG Road".to_owned(),
                ..ShippingAddress::default()
            }),
        )
        .unwrap();
        Order::pending(draft, gateway_id.to_owned(), created_at)
    }

    #[tokio::test]
    async fn test_transition_only_applies_to_pending() {
        let store = MemoryOrderStore::new();
        store
            .insert(&pending(UserId::generate(), "order_1", Utc::now()))
            .await
            .unwrap();

        let confirmation = PaymentConfirmation {
            payment_id: "pay_1".to_owned(),
            signature: "sig".to_owned(),
        };
        let paid = store
            .transition_pending("order_1", OrderStatus::Paid, Some(&confirmation))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment.gateway_payment_id.as_deref(), Some("pay_1"));

        let again = store
            .transition_pending("order_1", OrderStatus::Failed, None)
            .await
            .unwrap();
        assert!(again.is_none());
        let stored = store.find_by_gateway_order_id("order_1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_duplicate_gateway_id_conflicts() {
        let store = MemoryOrderStore::new();
        let user = UserId::generate();
        store.insert(&pending(user, "order_1", Utc::now())).await.unwrap();
        let err = store
            .insert(&pending(user, "order_1", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_total() {
        let store = MemoryOrderStore::new();
        let user = UserId::generate();
        let now = Utc::now();
        for i in 0..5 {
            store
                .insert(&pending(user, &format!("order_{i}"), now - Duration::minutes(i)))
                .await
                .unwrap();
        }
        store
            .insert(&pending(UserId::generate(), "order_other", now))
            .await
            .unwrap();

        let page = store
            .list(OrderFilter::User(user), PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[0].payment.gateway_order_id.as_deref(), Some("order_0"));
        assert_eq!(page.orders[1].payment.gateway_order_id.as_deref(), Some("order_1"));

        let last = store
            .list(OrderFilter::User(user), PageRequest::new(3, 2))
            .await
            .unwrap();
        assert_eq!(last.orders.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cart_resets_items_and_total() {
        let store = MemoryCartStore::new();
        let user = UserId::generate();
        store
            .put(Cart {
                user_id: user,
                items: vec![crate::models::CartItem {
                    product_id: ProductId::generate(),
                    quantity: 2,
                    price: Money::from_parts(50, 0).unwrap(),
                }],
                total_price: Money::from_parts(100, 0).unwrap(),
            })
            .await;

        store.clear(user).await.unwrap();
        assert!(store.get(user).await.unwrap().is_empty());
    }
}
