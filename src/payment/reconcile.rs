//! Order reconciliation state machine.
//!
//! Creates pending orders at checkout and transitions them on gateway
//! callbacks or explicit verification. Stock for catalog-backed items is held
//! by decrementing at checkout time; a failed payment releases the hold, a
//! confirmed payment keeps it. Transitions are idempotent per transaction
//! reference: replaying a callback is a no-op once the payment reached the
//! matching terminal status.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::PayuConfig;
use crate::domain::{
    LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::error::{Error, Result};
use crate::events::{EventPublisher, OrderEvent};
use crate::payment::gateway::{PayuCheckoutForm, PayuGateway, VerifiedStatus};
use crate::payment::hash::PayuHasher;
use crate::payment::split::PaymentSplit;
use crate::payment::{format_amount, round_money};

fn default_quantity() -> u32 {
    1
}

/// Checkout request body. Either `product_id` (catalog purchase) or
/// `product_name` + `price` (inline line) must be supplied.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "buyer_ref is required"))]
    pub buyer_ref: String,
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 1_000_000, message = "quantity must be between 1 and 1000000"))]
    pub quantity: u32,
    pub payment_method: PaymentMethod,
    #[validate]
    pub shipping_address: ShippingAddress,
}

/// Success callback form posted by the gateway. The raw `amount` string is
/// kept as received so the response hash is recomputed over the exact bytes
/// the gateway signed.
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessCallback {
    #[serde(default)]
    pub mihpayid: String,
    pub status: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// Redirect payload for the hosted checkout; `None` for COD.
    pub payment: Option<PayuCheckoutForm>,
}

pub struct Reconciler {
    products: Arc<dyn crate::store::ProductStore>,
    orders: Arc<dyn crate::store::OrderStore>,
    gateway: PayuGateway,
    hasher: PayuHasher,
    events: EventPublisher,
}

impl Reconciler {
    pub fn new(
        config: PayuConfig,
        products: Arc<dyn crate::store::ProductStore>,
        orders: Arc<dyn crate::store::OrderStore>,
        events: EventPublisher,
    ) -> Result<Self> {
        let hasher = PayuHasher::new(&config);
        let gateway = PayuGateway::new(config)?;
        Ok(Self { products, orders, gateway, hasher, events })
    }

    pub fn gateway(&self) -> &PayuGateway {
        &self.gateway
    }

    /// `TXN_<millis>_<8 hex>`. A collision on insert is treated as a fatal
    /// configuration error, not retried.
    fn generate_txn_ref() -> String {
        format!(
            "TXN_{}_{}",
            Utc::now().timestamp_millis(),
            hex::encode(rand::random::<[u8; 4]>())
        )
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutOutcome> {
        request
            .validate()
            .map_err(|e| Error::Validation(e.to_string().replace('\n', "; ")))?;

        // Resolve the line item to a unit price and a product description.
        let (line_item, unit_price, productinfo) =
            match (request.product_id, &request.product_name, request.price) {
                (Some(id), None, None) => {
                    let product =
                        self.products.find(id).await?.ok_or(Error::NotFound("Product"))?;
                    if !product.has_stock(request.quantity) {
                        return Err(Error::InsufficientStock {
                            name: product.name,
                            available: product.stock,
                        });
                    }
                    let name = product.name.clone();
                    (LineItem::catalog(id, request.quantity), product.price, name)
                }
                (None, Some(name), Some(price)) => {
                    let item = LineItem::inline(name.clone(), price, request.quantity);
                    item.check()?;
                    (item, price, name.clone())
                }
                _ => {
                    return Err(Error::Validation(
                        "Provide either product_id or product_name with price".into(),
                    ))
                }
            };

        let total = round_money(unit_price * Decimal::from(request.quantity));
        let split = PaymentSplit::compute(total, request.payment_method);

        match request.payment_method {
            PaymentMethod::Cod => self.checkout_cod(request, line_item, total, split).await,
            PaymentMethod::Online | PaymentMethod::Partial => {
                self.checkout_gateway(request, line_item, total, split, &productinfo).await
            }
        }
    }

    /// COD commits the item immediately: payment is deferred to delivery, so
    /// the order goes straight to Processing and stock is decremented now.
    async fn checkout_cod(
        &self,
        request: CheckoutRequest,
        line_item: LineItem,
        total: Decimal,
        split: PaymentSplit,
    ) -> Result<CheckoutOutcome> {
        self.take_hold(std::slice::from_ref(&line_item)).await?;

        let order = match self
            .persist_order(&request, line_item.clone(), total, &split, None, OrderStatus::Processing)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                self.release_hold(std::slice::from_ref(&line_item)).await;
                return Err(e);
            }
        };

        tracing::info!(order_id = %order.id, "COD order placed");
        self.events
            .publish(OrderEvent::Placed {
                order_id: order.id,
                buyer_ref: order.buyer_ref.clone(),
                payment_method: order.payment_method,
                total_amount: order.total_amount,
            })
            .await;
        Ok(CheckoutOutcome { order, payment: None })
    }

    /// ONLINE/PARTIAL places a stock hold, persists a Pending order keyed by
    /// a fresh transaction reference and returns the hosted-checkout payload.
    async fn checkout_gateway(
        &self,
        request: CheckoutRequest,
        line_item: LineItem,
        total: Decimal,
        split: PaymentSplit,
        productinfo: &str,
    ) -> Result<CheckoutOutcome> {
        let txn_ref = Self::generate_txn_ref();
        let amount = format_amount(split.charge_amount);
        let form = self.gateway.build_checkout_form(
            &txn_ref,
            &amount,
            productinfo,
            &request.first_name,
            &request.email,
            request.phone.as_deref().unwrap_or(""),
        );

        self.take_hold(std::slice::from_ref(&line_item)).await?;

        let order = match self
            .persist_order(&request, line_item.clone(), total, &split, Some(txn_ref.clone()), OrderStatus::Pending)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // The hold must not outlive a failed insert.
                self.release_hold(std::slice::from_ref(&line_item)).await;
                return Err(e);
            }
        };

        tracing::info!(order_id = %order.id, txnid = %txn_ref, "payment initiated");
        self.events
            .publish(OrderEvent::Placed {
                order_id: order.id,
                buyer_ref: order.buyer_ref.clone(),
                payment_method: order.payment_method,
                total_amount: order.total_amount,
            })
            .await;
        Ok(CheckoutOutcome { order, payment: Some(form) })
    }

    async fn persist_order(
        &self,
        request: &CheckoutRequest,
        line_item: LineItem,
        total: Decimal,
        split: &PaymentSplit,
        txn_ref: Option<String>,
        order_status: OrderStatus,
    ) -> Result<Order> {
        let now = Utc::now();
        self.orders
            .insert(Order {
                id: Uuid::now_v7(),
                buyer_ref: request.buyer_ref.clone(),
                line_items: vec![line_item],
                total_amount: total,
                advance_amount: split.advance_amount,
                remaining_amount: split.remaining_amount,
                payment_method: request.payment_method,
                payment_txn_ref: txn_ref,
                payment_status: PaymentStatus::Pending,
                order_status,
                delivery_payment_pending: split.delivery_payment_pending,
                shipping_address: request.shipping_address.clone(),
                created_at: now,
                updated_at: now,
            })
            .await
    }

    /// Gateway success callback. Rejects on hash mismatch without touching
    /// the order; otherwise confirms the payment, idempotently.
    pub async fn confirm_payment(&self, callback: &SuccessCallback) -> Result<Order> {
        let order = self
            .orders
            .find_by_txn_ref(&callback.txnid)
            .await?
            .ok_or_else(|| {
                tracing::error!(txnid = %callback.txnid, "success callback for unknown order");
                Error::NotFound("Order")
            })?;

        if !self.hasher.verify_callback(
            &callback.hash,
            &callback.status,
            &callback.email,
            &callback.firstname,
            &callback.productinfo,
            &callback.amount,
            &callback.txnid,
        ) {
            tracing::warn!(txnid = %callback.txnid, "callback hash mismatch — possible tampering");
            return Err(Error::HashMismatch);
        }

        self.apply_success(order).await
    }

    /// Gateway failure callback. Unknown transaction references are a silent
    /// no-op: the gateway sends failure notices for expired attempts too.
    pub async fn fail_payment(&self, txnid: &str) -> Result<Option<Order>> {
        let Some(order) = self.orders.find_by_txn_ref(txnid).await? else {
            tracing::warn!(txnid, "failure callback for unknown transaction, ignoring");
            return Ok(None);
        };
        self.apply_failure(order).await.map(Some)
    }

    /// Out-of-band verification result, mapped onto the same transitions as
    /// the corresponding callback. Used when a callback was missed.
    pub async fn apply_verification(&self, txnid: &str, status: VerifiedStatus) -> Result<Order> {
        let order = self
            .orders
            .find_by_txn_ref(txnid)
            .await?
            .ok_or(Error::NotFound("Order"))?;
        match status {
            VerifiedStatus::Success => self.apply_success(order).await,
            VerifiedStatus::Failure => self.apply_failure(order).await,
        }
    }

    /// Each transition is first claimed via a compare-and-set on the stored
    /// payment status; stock is only adjusted by the claimant. A lost claim
    /// means a concurrent callback landed in between, so re-read and
    /// re-evaluate from the new status.
    async fn apply_success(&self, order: Order) -> Result<Order> {
        let mut order = order;
        loop {
            let expected = order.payment_status;
            match expected {
                // Replay of an already-confirmed payment: no state or stock change.
                PaymentStatus::Success | PaymentStatus::Partial => return Ok(order),
                PaymentStatus::Failed => {
                    // Conflicting callbacks; the latest gateway-confirmed
                    // status wins.
                    tracing::warn!(
                        order_id = %order.id,
                        "success arrived after recorded failure, re-confirming"
                    );
                }
                PaymentStatus::Pending => {}
            }
            let mut next = order.clone();
            next.confirm_payment();
            if self.orders.transition_payment(&next, expected).await? {
                if expected == PaymentStatus::Failed {
                    // The hold was released on failure, take it again.
                    self.retake_hold(&next.line_items).await;
                }
                tracing::info!(order_id = %next.id, status = next.payment_status.as_str(), "payment confirmed");
                self.events
                    .publish(OrderEvent::PaymentConfirmed {
                        order_id: next.id,
                        txn_ref: next.payment_txn_ref.clone().unwrap_or_default(),
                        amount: next.advance_amount,
                    })
                    .await;
                return Ok(next);
            }
            order = self.orders.find(order.id).await?.ok_or(Error::NotFound("Order"))?;
        }
    }

    async fn apply_failure(&self, order: Order) -> Result<Order> {
        let mut order = order;
        loop {
            let expected = order.payment_status;
            match expected {
                PaymentStatus::Failed => return Ok(order),
                PaymentStatus::Success | PaymentStatus::Partial => {
                    tracing::warn!(
                        order_id = %order.id,
                        "failure arrived after recorded success, overriding"
                    );
                }
                PaymentStatus::Pending => {}
            }
            let mut next = order.clone();
            next.fail_payment();
            if self.orders.transition_payment(&next, expected).await? {
                self.release_hold(&next.line_items).await;
                tracing::info!(order_id = %next.id, "payment failed, order cancelled");
                self.events
                    .publish(OrderEvent::PaymentFailed {
                        order_id: next.id,
                        txn_ref: next.payment_txn_ref.clone().unwrap_or_default(),
                    })
                    .await;
                return Ok(next);
            }
            order = self.orders.find(order.id).await?.ok_or(Error::NotFound("Order"))?;
        }
    }

    /// Decrement stock for every catalog-backed line. Inline lines carry no
    /// stock. Fails atomically per line when not enough remains.
    async fn take_hold(&self, items: &[LineItem]) -> Result<()> {
        for item in items {
            if let Some(product_ref) = item.product_ref {
                self.products.decrement_stock(product_ref, item.quantity).await?;
            }
        }
        Ok(())
    }

    /// Return held stock. Best-effort: a product deleted since checkout is
    /// logged, not propagated, so the payment transition still lands.
    async fn release_hold(&self, items: &[LineItem]) {
        for item in items {
            if let Some(product_ref) = item.product_ref {
                if let Err(e) = self.products.restore_stock(product_ref, item.quantity).await {
                    tracing::error!(%product_ref, error = %e, "failed to release stock hold");
                }
            }
        }
    }

    /// Re-take a hold that was released by an earlier failure callback. The
    /// payment is gateway-confirmed at this point, so an exhausted stock is
    /// an oversell condition to surface, not a reason to refuse the money.
    async fn retake_hold(&self, items: &[LineItem]) {
        for item in items {
            if let Some(product_ref) = item.product_ref {
                if let Err(e) = self.products.decrement_stock(product_ref, item.quantity).await {
                    tracing::error!(%product_ref, error = %e, "could not re-hold stock for confirmed payment");
                }
            }
        }
    }
}
