//! IMI Commerce Backend
//!
//! E-commerce service with a PayU hosted-checkout integration.
//!
//! ## Features
//! - Product catalog management
//! - Checkout with ONLINE / COD / PARTIAL payment methods
//! - PayU hash handshake (SHA-512) and callback reconciliation
//! - Out-of-band payment verification fallback
//! - Inventory holds released on failed payments

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod http;
pub mod payment;
pub mod store;

pub use error::{Error, Result};
