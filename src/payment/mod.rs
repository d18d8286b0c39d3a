//! PayU payment integration: hash handshake, amount splitting, gateway
//! adapter and the order reconciliation state machine.

pub mod gateway;
pub mod hash;
pub mod reconcile;
pub mod split;

pub use gateway::{GatewayResponse, PayuCheckoutForm, PayuGateway, VerifiedStatus};
pub use hash::PayuHasher;
pub use reconcile::{CheckoutOutcome, CheckoutRequest, Reconciler, SuccessCallback};
pub use split::PaymentSplit;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two decimal places, half-up. All monetary rounding in the
/// payment flow goes through here.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount with exactly two decimal digits, as the gateway hash
/// protocol requires.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_formatted_with_two_decimals() {
        assert_eq!(format_amount(Decimal::new(100, 0)), "100.00");
        assert_eq!(format_amount(Decimal::new(19999, 2)), "199.99");
        assert_eq!(format_amount(Decimal::new(99995, 3)), "100.00"); // half-up
    }
}
