//! Catalog product: the reconciler only ever reads `price` and adjusts `stock`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, description: Option<String>, price: Decimal, stock: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            sku: format!("SKU-{:08}", rand::random::<u32>()),
            name: name.into(),
            description,
            price,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn stock_check() {
        let p = Product::new("Widget", None, Decimal::new(1999, 2), 3);
        assert!(p.has_stock(3));
        assert!(!p.has_stock(4));
    }
}
