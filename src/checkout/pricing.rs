//! Server-authoritative pricing.
//!
//! Clients submit selections only; every amount on an order comes from
//! this policy applied to catalog prices read inside the order
//! transaction.

use rust_decimal::Decimal;

use crate::domain::aggregates::{DeliveryType, OrderAmounts, PaymentMethod};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug)]
pub struct PricingPolicy {
    pub delivery_fee: Decimal,
    pub transfer_discount_rate: Decimal,
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            delivery_fee: Decimal::new(120, 0),
            // 5% off for bank transfer
            transfer_discount_rate: Decimal::new(5, 2),
            tax_rate: Decimal::ZERO,
        }
    }
}

impl PricingPolicy {
    pub fn quote(
        &self,
        subtotal: Money,
        delivery_type: DeliveryType,
        payment_method: PaymentMethod,
    ) -> OrderAmounts {
        let currency = subtotal.currency().to_string();
        let shipping = match delivery_type {
            DeliveryType::Delivery => Money::new(self.delivery_fee, &currency),
            DeliveryType::Pickup => Money::zero(&currency),
        };
        let discount = match payment_method {
            PaymentMethod::Transfer => Money::new(
                (subtotal.amount() * self.transfer_discount_rate).round_dp(2),
                &currency,
            ),
            PaymentMethod::Cash => Money::zero(&currency),
        };
        let tax = Money::new((subtotal.amount() * self.tax_rate).round_dp(2), &currency);
        let total = subtotal.amount() + tax.amount() + shipping.amount() - discount.amount();
        OrderAmounts {
            subtotal,
            tax_amount: tax,
            shipping_amount: shipping,
            discount_amount: discount,
            total_amount: Money::new(total, &currency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(v: i64) -> Money {
        Money::new(Decimal::new(v, 0), "MXN")
    }

    #[test]
    fn pickup_cash_has_no_extras() {
        let amounts = PricingPolicy::default().quote(
            money(200),
            DeliveryType::Pickup,
            PaymentMethod::Cash,
        );
        assert_eq!(amounts.shipping_amount.amount(), Decimal::ZERO);
        assert_eq!(amounts.discount_amount.amount(), Decimal::ZERO);
        assert_eq!(amounts.total_amount.amount(), Decimal::new(200, 0));
        assert!(amounts.is_consistent());
    }

    #[test]
    fn delivery_transfer_applies_fee_and_discount() {
        let amounts = PricingPolicy::default().quote(
            money(200),
            DeliveryType::Delivery,
            PaymentMethod::Transfer,
        );
        assert_eq!(amounts.shipping_amount.amount(), Decimal::new(120, 0));
        assert_eq!(amounts.discount_amount.amount(), Decimal::new(10, 0));
        assert_eq!(amounts.total_amount.amount(), Decimal::new(310, 0));
        assert!(amounts.is_consistent());
    }

    #[test]
    fn discount_rounds_to_cents() {
        let amounts = PricingPolicy::default().quote(
            Money::new(Decimal::new(9999, 2), "MXN"), // 99.99
            DeliveryType::Pickup,
            PaymentMethod::Transfer,
        );
        // 99.99 * 0.05 = 4.9995 -> 5.00
        assert_eq!(amounts.discount_amount.amount(), Decimal::new(500, 2));
        assert!(amounts.is_consistent());
    }
}
