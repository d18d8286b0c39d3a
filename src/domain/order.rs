//! Order entity and its payment/fulfilment state machine.
//!
//! Orders are created by the reconciler at checkout time and mutated only in
//! response to a gateway callback or an explicit verification call. They are
//! never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};

/// Closed set of payment variants. Unknown strings are rejected at
/// deserialization instead of being defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Online,
    Cod,
    Partial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Cod => "COD",
            Self::Partial => "PARTIAL",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ONLINE" => Ok(Self::Online),
            "COD" => Ok(Self::Cod),
            "PARTIAL" => Ok(Self::Partial),
            other => Err(Error::Validation(format!("Unknown payment method: {other}"))),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Partial => "Partial",
            Self::Failed => "Failed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Partial" => Ok(Self::Partial),
            "Failed" => Ok(Self::Failed),
            other => Err(Error::Validation(format!("Unknown payment status: {other}"))),
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(Error::Validation(format!("Unknown order status: {other}"))),
        }
    }
}

/// Upper bound on a single line's quantity. Keeps quantities safely inside
/// i32 range for stock arithmetic; anything near it is bogus input anyway.
pub const MAX_LINE_QUANTITY: u32 = 1_000_000;

/// One ordered line. Catalog-backed lines carry `product_ref`; inline lines
/// carry `product_name` + `unit_price`. Exactly one of the two forms must be
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_ref: Option<Uuid>,
    pub product_name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: u32,
}

impl LineItem {
    pub fn catalog(product_ref: Uuid, quantity: u32) -> Self {
        Self { product_ref: Some(product_ref), product_name: None, unit_price: None, quantity }
    }

    pub fn inline(product_name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            product_ref: None,
            product_name: Some(product_name.into()),
            unit_price: Some(unit_price),
            quantity,
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.quantity < 1 {
            return Err(Error::Validation("Quantity must be at least 1".into()));
        }
        if self.quantity > MAX_LINE_QUANTITY {
            return Err(Error::Validation(format!(
                "Quantity cannot exceed {MAX_LINE_QUANTITY}"
            )));
        }
        match (self.product_ref, &self.product_name, self.unit_price) {
            (Some(_), None, None) => Ok(()),
            (None, Some(_), Some(price)) if price >= Decimal::ZERO => Ok(()),
            (None, Some(_), Some(_)) => {
                Err(Error::Validation("Unit price cannot be negative".into()))
            }
            _ => Err(Error::Validation(
                "Line item needs either a product reference or a name and unit price".into(),
            )),
        }
    }
}

/// Required for every order regardless of payment method.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address line is required"))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_ref: String,
    pub line_items: Vec<LineItem>,
    /// Fixed at creation, never recomputed.
    pub total_amount: Decimal,
    pub advance_amount: Decimal,
    pub remaining_amount: Decimal,
    pub payment_method: PaymentMethod,
    /// External transaction reference; present for ONLINE/PARTIAL, absent for COD.
    pub payment_txn_ref: Option<String>,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// Money still owed at delivery time (COD, or the remainder of a PARTIAL).
    pub delivery_payment_pending: bool,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Payment reached a terminal success variant; replayed success callbacks
    /// must not move it backwards.
    pub fn is_payment_settled(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Success | PaymentStatus::Partial)
    }

    pub fn confirm_payment(&mut self) {
        self.payment_status = match self.payment_method {
            PaymentMethod::Partial => PaymentStatus::Partial,
            _ => PaymentStatus::Success,
        };
        self.order_status = OrderStatus::Processing;
        self.touch();
    }

    pub fn fail_payment(&mut self) {
        self.payment_status = PaymentStatus::Failed;
        self.order_status = OrderStatus::Cancelled;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) fn test_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(),
        phone: "+919900112233".into(),
        line1: "14 MG Road".into(),
        line2: None,
        city: "Bengaluru".into(),
        state: "KA".into(),
        postal_code: "560001".into(),
        country: "IN".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn payment_method_round_trips_as_uppercase() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"COD\"");
        let m: PaymentMethod = serde_json::from_str("\"PARTIAL\"").unwrap();
        assert_eq!(m, PaymentMethod::Partial);
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        assert!(serde_json::from_str::<PaymentMethod>("\"WALLET\"").is_err());
    }

    #[test]
    fn line_item_needs_exactly_one_form() {
        assert!(LineItem::catalog(Uuid::new_v4(), 1).check().is_ok());
        assert!(LineItem::inline("Custom print", Decimal::new(4999, 2), 2).check().is_ok());

        let both = LineItem {
            product_ref: Some(Uuid::new_v4()),
            product_name: Some("X".into()),
            unit_price: Some(Decimal::ONE),
            quantity: 1,
        };
        assert!(both.check().is_err());

        let neither = LineItem { product_ref: None, product_name: None, unit_price: None, quantity: 1 };
        assert!(neither.check().is_err());

        let zero_qty = LineItem::catalog(Uuid::new_v4(), 0);
        assert!(zero_qty.check().is_err());

        let absurd_qty = LineItem::catalog(Uuid::new_v4(), MAX_LINE_QUANTITY + 1);
        assert!(absurd_qty.check().is_err());
    }

    #[test]
    fn address_requires_all_core_fields() {
        let mut addr = test_address();
        assert!(addr.validate().is_ok());
        addr.postal_code.clear();
        assert!(addr.validate().is_err());
    }
}
