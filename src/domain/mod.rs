//! Domain entities shared across the service.

pub mod order;
pub mod product;

pub use order::{
    LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
pub use product::Product;
