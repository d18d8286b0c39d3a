//! In-memory store implementations for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Order, PaymentStatus, Product};
use crate::error::{Error, Result};
use crate::store::{OrderStore, ProductStore};

#[derive(Default)]
pub struct InMemoryProductStore {
    items: RwLock<HashMap<Uuid, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: Product) -> Result<Product> {
        self.items.write().await.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.items.read().await.values().cloned().collect();
        products.sort_by_key(|p| p.created_at);
        Ok(products)
    }

    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<()> {
        let mut items = self.items.write().await;
        let product = items.get_mut(&id).ok_or(Error::NotFound("Product"))?;
        if product.stock < quantity as i32 {
            return Err(Error::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
            });
        }
        product.stock -= quantity as i32;
        product.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn restore_stock(&self, id: Uuid, quantity: u32) -> Result<()> {
        let mut items = self.items.write().await;
        let product = items.get_mut(&id).ok_or(Error::NotFound("Product"))?;
        product.stock += quantity as i32;
        product.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    items: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        let mut items = self.items.write().await;
        if let Some(txn) = &order.payment_txn_ref {
            if items.values().any(|o| o.payment_txn_ref.as_deref() == Some(txn)) {
                return Err(Error::TxnRefCollision(txn.clone()));
            }
        }
        items.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn find_by_txn_ref(&self, txn_ref: &str) -> Result<Option<Order>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|o| o.payment_txn_ref.as_deref() == Some(txn_ref))
            .cloned())
    }

    async fn transition_payment(&self, order: &Order, expected: PaymentStatus) -> Result<bool> {
        let mut items = self.items.write().await;
        let current = items.get_mut(&order.id).ok_or(Error::NotFound("Order"))?;
        // Check under the write lock so two racing callbacks cannot both win.
        if current.payment_status != expected {
            return Ok(false);
        }
        *current = order.clone();
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.items.read().await.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::order::test_address;
    use crate::domain::{LineItem, OrderStatus, PaymentMethod};

    fn pending_order(txn_ref: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::now_v7(),
            buyer_ref: "buyer-1".into(),
            line_items: vec![LineItem::inline("Widget", Decimal::new(10000, 2), 1)],
            total_amount: Decimal::new(10000, 2),
            advance_amount: Decimal::new(10000, 2),
            remaining_amount: Decimal::ZERO,
            payment_method: PaymentMethod::Online,
            payment_txn_ref: Some(txn_ref.into()),
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            delivery_payment_pending: false,
            shipping_address: test_address(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn decrement_is_guarded_by_available_stock() {
        let store = InMemoryProductStore::new();
        let p = store
            .insert(Product::new("Widget", None, Decimal::new(1000, 2), 2))
            .await
            .unwrap();

        store.decrement_stock(p.id, 2).await.unwrap();
        let err = store.decrement_stock(p.id, 1).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { available: 0, .. }));

        store.restore_stock(p.id, 2).await.unwrap();
        assert_eq!(store.find(p.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn payment_transition_claim_is_won_at_most_once() {
        let store = InMemoryOrderStore::new();
        let order = store.insert(pending_order("TXN_claim")).await.unwrap();

        let mut confirmed = order.clone();
        confirmed.confirm_payment();
        assert!(store
            .transition_payment(&confirmed, PaymentStatus::Pending)
            .await
            .unwrap());

        // A second transition expecting Pending must lose: the status moved.
        let mut failed = order.clone();
        failed.fail_payment();
        assert!(!store
            .transition_payment(&failed, PaymentStatus::Pending)
            .await
            .unwrap());

        let stored = store.find(order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Success);
    }
}
