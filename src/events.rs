//! Order lifecycle events, published to NATS when configured.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::PaymentMethod;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        buyer_ref: String,
        payment_method: PaymentMethod,
        total_amount: Decimal,
    },
    PaymentConfirmed {
        order_id: Uuid,
        txn_ref: String,
        amount: Decimal,
    },
    PaymentFailed {
        order_id: Uuid,
        txn_ref: String,
    },
}

impl OrderEvent {
    fn subject(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "commerce.orders.placed",
            Self::PaymentConfirmed { .. } => "commerce.orders.payment_confirmed",
            Self::PaymentFailed { .. } => "commerce.orders.payment_failed",
        }
    }
}

/// Publishes to NATS when a client is configured, and only logs otherwise.
/// Event delivery is best-effort: a publish failure never fails the request
/// that raised it.
#[derive(Clone)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn disabled() -> Self {
        Self { nats: None }
    }

    pub async fn publish(&self, event: OrderEvent) {
        tracing::debug!(subject = event.subject(), "order event");
        let Some(client) = &self.nats else { return };
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = client.publish(event.subject(), payload.into()).await {
                    tracing::error!(subject = event.subject(), error = %e, "failed to publish order event");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize order event"),
        }
    }
}
