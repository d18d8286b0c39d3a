//! Splits an order total into charge / advance / remaining amounts per
//! payment method.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::PaymentMethod;
use crate::payment::round_money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSplit {
    /// Amount sent to the gateway now. Zero for COD.
    pub charge_amount: Decimal,
    pub advance_amount: Decimal,
    pub remaining_amount: Decimal,
    pub delivery_payment_pending: bool,
}

impl PaymentSplit {
    /// `advance + remaining == total` holds exactly after 2-dp rounding: the
    /// advance is rounded half-up and the remainder absorbs any rounding
    /// difference.
    pub fn compute(total_amount: Decimal, method: PaymentMethod) -> Self {
        let total = round_money(total_amount);
        match method {
            PaymentMethod::Online => Self {
                charge_amount: total,
                advance_amount: total,
                remaining_amount: Decimal::ZERO,
                delivery_payment_pending: false,
            },
            PaymentMethod::Cod => Self {
                charge_amount: Decimal::ZERO,
                advance_amount: Decimal::ZERO,
                remaining_amount: total,
                delivery_payment_pending: true,
            },
            PaymentMethod::Partial => {
                let advance = round_money(total * Decimal::new(5, 1));
                Self {
                    charge_amount: advance,
                    advance_amount: advance,
                    remaining_amount: total - advance,
                    delivery_payment_pending: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn online_charges_everything_upfront() {
        let s = PaymentSplit::compute(dec("250.00"), PaymentMethod::Online);
        assert_eq!(s.charge_amount, dec("250.00"));
        assert_eq!(s.advance_amount, dec("250.00"));
        assert_eq!(s.remaining_amount, Decimal::ZERO);
        assert!(!s.delivery_payment_pending);
    }

    #[test]
    fn cod_defers_everything() {
        let s = PaymentSplit::compute(dec("250.00"), PaymentMethod::Cod);
        assert_eq!(s.charge_amount, Decimal::ZERO);
        assert_eq!(s.advance_amount, Decimal::ZERO);
        assert_eq!(s.remaining_amount, dec("250.00"));
        assert!(s.delivery_payment_pending);
    }

    #[test]
    fn partial_rounds_half_up_and_reconciles_exactly() {
        let s = PaymentSplit::compute(dec("199.99"), PaymentMethod::Partial);
        assert_eq!(s.advance_amount, dec("100.00"));
        assert_eq!(s.remaining_amount, dec("99.99"));
        assert!(s.delivery_payment_pending);
    }

    #[test]
    fn advance_plus_remaining_equals_total_for_every_method() {
        let totals = ["0.01", "0.03", "1.25", "19.99", "199.99", "1000.01", "333.33"];
        for t in totals {
            let total = dec(t);
            for method in [PaymentMethod::Online, PaymentMethod::Cod, PaymentMethod::Partial] {
                let s = PaymentSplit::compute(total, method);
                assert_eq!(
                    s.advance_amount + s.remaining_amount,
                    total,
                    "total {t} method {method:?}"
                );
            }
        }
    }
}
