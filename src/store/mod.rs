//! Persistence ports. The reconciler and the HTTP layer only ever see these
//! traits; Postgres backs them in production and the in-memory stores back
//! them in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Order, PaymentStatus, Product};
use crate::error::Result;

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: Product) -> Result<Product>;
    async fn find(&self, id: Uuid) -> Result<Option<Product>>;
    async fn list(&self) -> Result<Vec<Product>>;
    /// Decrement stock by `quantity`, failing with `InsufficientStock` when
    /// not enough remains. The check and the decrement are one atomic step.
    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<()>;
    /// Return previously held stock, e.g. when a payment fails.
    async fn restore_stock(&self, id: Uuid, quantity: u32) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order. The transaction reference is unique; a collision
    /// fails with `TxnRefCollision`.
    async fn insert(&self, order: Order) -> Result<Order>;
    async fn find(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_by_txn_ref(&self, txn_ref: &str) -> Result<Option<Order>>;
    /// Persist a payment transition only if the stored payment status still
    /// equals `expected`. Returns whether the claim won; a `false` means a
    /// concurrent transition got there first and the caller must re-read.
    async fn transition_payment(&self, order: &Order, expected: PaymentStatus) -> Result<bool>;
    async fn list(&self) -> Result<Vec<Order>>;
}
