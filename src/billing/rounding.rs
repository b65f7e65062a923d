//! Rounding conventions shared by the billing domain.
//!
//! Energy counters keep two decimals, every monetary amount is rounded
//! half-to-even to whole XPF.

/// Round half-to-even at zero decimal places.
pub fn round_half_even(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor == 0.5 {
        if (floor as i64) % 2 == 0 { floor } else { floor + 1.0 }
    } else {
        value.round()
    }
}

/// Round a monetary amount to whole XPF.
pub fn round_xpf(value: f64) -> f64 {
    round_half_even(value)
}

/// Round an energy value to two decimals (kWh).
pub fn round2(value: f64) -> f64 {
    round_half_even(value * 100.0) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.5, 0.0)]
    #[case(1.5, 2.0)]
    #[case(2.5, 2.0)]
    #[case(3.5, 4.0)]
    #[case(-0.5, 0.0)]
    #[case(-1.5, -2.0)]
    #[case(-2.5, -2.0)]
    #[case(2.4, 2.0)]
    #[case(2.6, 3.0)]
    #[case(517.0000000000001, 517.0)]
    fn test_round_half_even(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(round_half_even(value), expected);
    }

    #[rstest]
    #[case(0.125, 0.12)]
    #[case(0.135, 0.14)]
    #[case(42.499, 42.5)]
    #[case(0.0, 0.0)]
    fn test_round2(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(round2(value), expected);
    }
}
