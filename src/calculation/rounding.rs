//! Money rounding primitives.
//!
//! These are the only places a monetary value is rounded. Phases pass
//! full-precision figures between each other; [`round_money`] and
//! [`round_ni`] are applied once per field at result assembly and
//! [`floor_to_pound`] once, where taxable pay is computed.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to the penny, midpoint away from zero.
///
/// ```
/// use uk_payroll_engine::calculation::round_money;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_money(Decimal::new(565806, 3)), Decimal::new(56581, 2));
/// assert_eq!(round_money(Decimal::new(5, 3)), Decimal::new(1, 2));
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an NI contribution to the penny, midpoint toward zero.
///
/// HMRC's exact percentage method drops a half penny rather than rounding
/// it up.
pub fn round_ni(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointTowardZero)
}

/// Rounds down to whole pounds, toward negative infinity.
pub fn floor_to_pound(amount: Decimal) -> Decimal {
    amount.floor()
}
