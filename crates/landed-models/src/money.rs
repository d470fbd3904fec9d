//! Fixed-precision helpers shared by the cost and FX pipelines.
//!
//! Every monetary amount that leaves the engine goes through [`round2`].
//! Ratios (CIF scalers, cross rates, averages) are carried at
//! [`RATIO_SCALE`] digits before being applied.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for intermediate ratios.
pub const RATIO_SCALE: u32 = 10;

/// Round half-up (ties away from zero) to exactly two fractional digits.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Round half-up to [`RATIO_SCALE`] digits.
pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATIO_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator` at ratio precision. `None` on a zero denominator.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).map(round_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round2_is_half_up() {
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
        assert_eq!(round2(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn round2_always_carries_two_digits() {
        assert_eq!(round2(dec!(100)).to_string(), "100.00");
        assert_eq!(round2(dec!(512.5)).to_string(), "512.50");
        assert_eq!(round2(Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn ratio_rounds_to_ten_digits() {
        assert_eq!(ratio(dec!(1), dec!(3)), Some(dec!(0.3333333333)));
        assert_eq!(ratio(dec!(2), dec!(3)), Some(dec!(0.6666666667)));
        assert_eq!(ratio(dec!(10250), dec!(10000)), Some(dec!(1.025)));
    }

    #[test]
    fn ratio_by_zero_is_none() {
        assert_eq!(ratio(dec!(5), Decimal::ZERO), None);
    }
}
