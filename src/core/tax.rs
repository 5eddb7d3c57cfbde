//! Tax and discount calculator.
//!
//! GST applies to every order type. The service charge applies to dine-in orders only and is
//! zero when waived. Once an order has been billed without a service charge despite a positive
//! subtotal and a non-zero configured rate, that waiver sticks through later edits.
//! Discounts are flat amounts clamped to `[0, subtotal + gst + service]`.

use crate::{
    core::money::{percent_of, round_money},
    entities::{
        order::{self, OrderType},
        restaurant,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A restaurant's rates, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRates {
    /// GST rate, e.g. 5 for 5%
    pub gst_rate_percent: Decimal,
    /// Service charge rate for dine-in
    pub service_rate_percent: Decimal,
}

impl From<&restaurant::Model> for TaxRates {
    fn from(r: &restaurant::Model) -> Self {
        Self {
            gst_rate_percent: r.gst_rate_percent,
            service_rate_percent: r.service_rate_percent,
        }
    }
}

/// The derived money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Charges {
    /// Sum of line totals
    pub subtotal: Decimal,
    /// GST on the subtotal
    pub gst: Decimal,
    /// Service charge on the subtotal
    pub service: Decimal,
    /// Discount after clamping
    pub discount: Decimal,
    /// `max(0, subtotal + gst + service - discount)`
    pub total: Decimal,
}

impl Charges {
    /// Reads the charges currently stored on an order.
    #[must_use]
    pub const fn of_order(order: &order::Model) -> Self {
        Self {
            subtotal: order.subtotal,
            gst: order.gst_amount,
            service: order.service_amount,
            discount: order.discount_amount,
            total: order.total_amount,
        }
    }

    /// Writes these charges onto an order model.
    pub const fn apply_to(self, order: &mut order::Model) {
        order.subtotal = self.subtotal;
        order.gst_amount = self.gst;
        order.service_amount = self.service;
        order.discount_amount = self.discount;
        order.total_amount = self.total;
    }

    /// Replaces the discount and recomputes the total from the other fields as they are.
    #[must_use]
    pub fn with_discount(self, discount: Decimal) -> Self {
        let (discount, total) = apply_discount(self.subtotal + self.gst + self.service, discount);
        Self {
            discount,
            total,
            ..self
        }
    }
}

fn apply_discount(gross: Decimal, discount: Decimal) -> (Decimal, Decimal) {
    let gross = round_money(gross);
    let discount = round_money(discount).max(Decimal::ZERO).min(gross);
    (discount, (gross - discount).max(Decimal::ZERO))
}

/// Service charge for a subtotal, honoring order type and waiver.
#[must_use]
pub fn service_charge(
    subtotal: Decimal,
    rates: TaxRates,
    order_type: OrderType,
    waived: bool,
) -> Decimal {
    if order_type != OrderType::DineIn || waived {
        Decimal::ZERO
    } else {
        percent_of(subtotal, rates.service_rate_percent)
    }
}

/// Computes gst, service, clamped discount and total for a subtotal.
#[must_use]
pub fn compute_charges(
    subtotal: Decimal,
    rates: TaxRates,
    order_type: OrderType,
    discount: Decimal,
    service_waived: bool,
) -> Charges {
    let subtotal = round_money(subtotal);
    let gst = percent_of(subtotal, rates.gst_rate_percent);
    let service = service_charge(subtotal, rates, order_type, service_waived);
    let (discount, total) = apply_discount(subtotal + gst + service, discount);
    Charges {
        subtotal,
        gst,
        service,
        discount,
        total,
    }
}

/// Whether previously stored amounts show the service charge was waived.
///
/// True when a dine-in order has a positive subtotal, the restaurant charges service, and
/// yet no service was billed.
#[must_use]
pub fn inferred_waiver(
    previous_subtotal: Decimal,
    previous_service: Decimal,
    rates: TaxRates,
    order_type: OrderType,
) -> bool {
    order_type == OrderType::DineIn
        && previous_subtotal > Decimal::ZERO
        && previous_service.is_zero()
        && rates.service_rate_percent > Decimal::ZERO
}

/// Whether service must stay at zero for this order going forward.
#[must_use]
pub fn waiver_in_effect(order: &order::Model, rates: TaxRates) -> bool {
    order.service_charge_waived
        || inferred_waiver(order.subtotal, order.service_amount, rates, order.order_type)
}

/// Tax-inclusive amount of newly added lines: their subtotal plus the gst and service they
/// attract. Discounts are not apportioned.
#[must_use]
pub fn tax_inclusive_amount(
    added_subtotal: Decimal,
    rates: TaxRates,
    order_type: OrderType,
    service_waived: bool,
) -> Decimal {
    let added = round_money(added_subtotal);
    added
        + percent_of(added, rates.gst_rate_percent)
        + service_charge(added, rates, order_type, service_waived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RATES: TaxRates = TaxRates {
        gst_rate_percent: dec!(5),
        service_rate_percent: dec!(10),
    };

    #[test]
    fn test_dine_in_charges() {
        let c = compute_charges(dec!(400), RATES, OrderType::DineIn, Decimal::ZERO, false);
        assert_eq!(c.gst, dec!(20));
        assert_eq!(c.service, dec!(40));
        assert_eq!(c.total, dec!(460));
    }

    #[test]
    fn test_no_service_outside_dine_in() {
        for order_type in [OrderType::Takeaway, OrderType::Delivery] {
            let c = compute_charges(dec!(400), RATES, order_type, Decimal::ZERO, false);
            assert_eq!(c.service, Decimal::ZERO);
            assert_eq!(c.total, dec!(420));
        }
    }

    #[test]
    fn test_waived_service() {
        let c = compute_charges(dec!(400), RATES, OrderType::DineIn, Decimal::ZERO, true);
        assert_eq!(c.service, Decimal::ZERO);
        assert_eq!(c.total, dec!(420));
    }

    #[test]
    fn test_discount_clamped() {
        let c = compute_charges(dec!(400), RATES, OrderType::DineIn, dec!(1000), false);
        assert_eq!(c.discount, dec!(460));
        assert_eq!(c.total, Decimal::ZERO);

        let c = compute_charges(dec!(400), RATES, OrderType::DineIn, dec!(-5), false);
        assert_eq!(c.discount, Decimal::ZERO);
        assert_eq!(c.total, dec!(460));

        let c = compute_charges(dec!(400), RATES, OrderType::DineIn, dec!(60), false);
        assert_eq!(c.total, dec!(400));
    }

    #[test]
    fn test_with_discount_keeps_existing_amounts() {
        let c = compute_charges(dec!(400), RATES, OrderType::DineIn, Decimal::ZERO, false)
            .with_discount(dec!(10));
        assert_eq!(c.gst, dec!(20));
        assert_eq!(c.service, dec!(40));
        assert_eq!(c.discount, dec!(10));
        assert_eq!(c.total, dec!(450));
    }

    #[test]
    fn test_inferred_waiver() {
        assert!(inferred_waiver(dec!(400), Decimal::ZERO, RATES, OrderType::DineIn));
        assert!(!inferred_waiver(dec!(400), dec!(40), RATES, OrderType::DineIn));
        // An empty order has not shown a waiver yet
        assert!(!inferred_waiver(Decimal::ZERO, Decimal::ZERO, RATES, OrderType::DineIn));
        // Restaurants that charge no service never imply a waiver
        let no_service = TaxRates {
            service_rate_percent: Decimal::ZERO,
            ..RATES
        };
        assert!(!inferred_waiver(dec!(400), Decimal::ZERO, no_service, OrderType::DineIn));
        assert!(!inferred_waiver(dec!(400), Decimal::ZERO, RATES, OrderType::Takeaway));
    }

    #[test]
    fn test_tax_inclusive_amount() {
        assert_eq!(
            tax_inclusive_amount(dec!(100), RATES, OrderType::DineIn, false),
            dec!(115)
        );
        assert_eq!(
            tax_inclusive_amount(dec!(100), RATES, OrderType::DineIn, true),
            dec!(105)
        );
    }
}
