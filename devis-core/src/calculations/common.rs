//! Shared helpers for premium arithmetic.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero, which is how premium
/// amounts are shown and compared in cents.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use devis_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Treats an absent amount as zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use devis_core::calculations::common::or_zero;
///
/// assert_eq!(or_zero(None), dec!(0));
/// assert_eq!(or_zero(Some(dec!(12.5))), dec!(12.5));
/// ```
pub fn or_zero(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        let result = round_half_up(dec!(2499.994));

        assert_eq!(result, dec!(2499.99));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        let result = round_half_up(dec!(2499.995));

        assert_eq!(result, dec!(2500.00));
    }

    #[test]
    fn round_half_up_preserves_whole_amounts() {
        let result = round_half_up(dec!(1500));

        assert_eq!(result, dec!(1500.00));
    }

    #[test]
    fn round_half_up_handles_small_values() {
        let result = round_half_up(dec!(0.004));

        assert_eq!(result, dec!(0.00));
    }

    // =========================================================================
    // or_zero tests
    // =========================================================================

    #[test]
    fn or_zero_defaults_missing_values() {
        assert_eq!(or_zero(None), Decimal::ZERO);
    }

    #[test]
    fn or_zero_keeps_present_values() {
        assert_eq!(or_zero(Some(dec!(0.0125))), dec!(0.0125));
    }
}
