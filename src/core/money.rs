//! Money helpers shared by pricing, tax and payment code.
//!
//! All amounts are `Decimal` rounded to 2 places, half away from zero.

use crate::entities::order::PaymentStatus;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

const DECIMAL_PLACES: u32 = 2;

/// Tolerance for "fully paid" comparisons.
pub const MONEY_TOLERANCE: Decimal = dec!(0.01);

/// Rounds an amount to currency precision.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * percent / 100`, rounded.
#[must_use]
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / Decimal::ONE_HUNDRED)
}

/// Payment status as a pure function of paid vs total.
///
/// Nothing paid is always `Due`, so an emptied order never reads as settled.
#[must_use]
pub fn derive_payment_status(paid: Decimal, total: Decimal) -> PaymentStatus {
    if paid <= Decimal::ZERO {
        PaymentStatus::Due
    } else if paid >= total - MONEY_TOLERANCE {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    }
}

/// Whether a stored payment status agrees with paid vs total.
///
/// A zero total settled explicitly is stored as `Paid` with nothing paid; everything else must
/// match [`derive_payment_status`].
#[must_use]
pub fn payment_status_consistent(status: PaymentStatus, paid: Decimal, total: Decimal) -> bool {
    status == derive_payment_status(paid, total)
        || (status == PaymentStatus::Paid && total.is_zero() && paid.is_zero())
}
