//! Postgres-backed stores. Line items and the shipping address are JSONB
//! columns; amounts are NUMERIC(12,2).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{LineItem, Order, PaymentStatus, Product, ShippingAddress};
use crate::error::{Error, Result};
use crate::store::{OrderStore, ProductStore};

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(&self, product: Product) -> Result<Product> {
        sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, sku, name, description, price, stock, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<()> {
        let updated =
            sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2")
                .bind(id)
                .bind(quantity as i32)
                .execute(&self.pool)
                .await?;
        if updated.rows_affected() == 0 {
            // Either the product is gone or the guard rejected the decrement.
            return match self.find(id).await? {
                Some(p) => Err(Error::InsufficientStock { name: p.name, available: p.stock }),
                None => Err(Error::NotFound("Product")),
            };
        }
        Ok(())
    }

    async fn restore_stock(&self, id: Uuid, quantity: u32) -> Result<()> {
        let updated =
            sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(quantity as i32)
                .execute(&self.pool)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound("Product"));
        }
        Ok(())
    }
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_ref: String,
    line_items: Json<Vec<LineItem>>,
    total_amount: Decimal,
    advance_amount: Decimal,
    remaining_amount: Decimal,
    payment_method: String,
    payment_txn_ref: Option<String>,
    payment_status: String,
    order_status: String,
    delivery_payment_pending: bool,
    shipping_address: Json<ShippingAddress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = Error;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            buyer_ref: row.buyer_ref,
            line_items: row.line_items.0,
            total_amount: row.total_amount,
            advance_amount: row.advance_amount,
            remaining_amount: row.remaining_amount,
            payment_method: row.payment_method.parse()?,
            payment_txn_ref: row.payment_txn_ref,
            payment_status: row.payment_status.parse()?,
            order_status: row.order_status.parse()?,
            delivery_payment_pending: row.delivery_payment_pending,
            shipping_address: row.shipping_address.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        let inserted = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (id, buyer_ref, line_items, total_amount, advance_amount, \
             remaining_amount, payment_method, payment_txn_ref, payment_status, order_status, \
             delivery_payment_pending, shipping_address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING *",
        )
        .bind(order.id)
        .bind(&order.buyer_ref)
        .bind(Json(&order.line_items))
        .bind(order.total_amount)
        .bind(order.advance_amount)
        .bind(order.remaining_amount)
        .bind(order.payment_method.as_str())
        .bind(&order.payment_txn_ref)
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(order.delivery_payment_pending)
        .bind(Json(&order.shipping_address))
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::TxnRefCollision(order.payment_txn_ref.clone().unwrap_or_default())
            } else {
                e.into()
            }
        })?;
        inserted.try_into()
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_by_txn_ref(&self, txn_ref: &str) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE payment_txn_ref = $1")
            .bind(txn_ref)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn transition_payment(&self, order: &Order, expected: PaymentStatus) -> Result<bool> {
        // The status guard makes the transition a compare-and-set: of two
        // racing callbacks only one row update can match.
        let updated = sqlx::query(
            "UPDATE orders SET payment_status = $2, order_status = $3, \
             delivery_payment_pending = $4, updated_at = $5 \
             WHERE id = $1 AND payment_status = $6",
        )
        .bind(order.id)
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(order.delivery_payment_pending)
        .bind(order.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }
}
