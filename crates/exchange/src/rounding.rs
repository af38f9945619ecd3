//! Precision rounding for balances and sizes.
//!
//! Exchanges quote per-asset decimal precisions; balances are rounded to
//! them before they are reported. The default mode rounds ties down,
//! matching the historical feeds this engine replays against; half-even
//! is available where banker's rounding is acceptable.

use types::{Cash, Size, SCALE};

/// Tie-breaking mode for precision rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Ties round down.
    #[default]
    HalfDown,
    /// Ties round to the even neighbour.
    HalfEven,
}

/// Round a raw fixed-point value to `decimals` places (0..=8).
pub fn round_raw(raw: i64, decimals: u32, mode: Rounding) -> i64 {
    let digits = decimals.min(8);
    let unit = 10i64.pow(8 - digits);
    if unit == 1 {
        return raw;
    }

    let down = raw.div_euclid(unit) * unit;
    let rem = raw.rem_euclid(unit);
    let half = unit / 2;

    let round_up = match mode {
        Rounding::HalfDown => rem > half,
        Rounding::HalfEven => rem > half || (rem == half && (down / unit) % 2 != 0),
    };

    if round_up {
        down + unit
    } else {
        down
    }
}

/// Round a cash amount to an asset's decimal precision.
pub fn round_cash(value: Cash, decimals: u32, mode: Rounding) -> Cash {
    Cash(round_raw(value.0, decimals, mode))
}

/// Round a size to an asset's decimal precision.
pub fn round_size(value: Size, decimals: u32, mode: Rounding) -> Size {
    Size(round_raw(value.0, decimals, mode))
}

/// Truncate a size down to a whole multiple of the lot increment.
pub fn round_to_lot(value: Size, lot: Size) -> Size {
    if lot.0 <= 0 {
        return value;
    }
    Size(value.0 / lot.0 * lot.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_down_ties_go_down() {
        // 1.005 at 2 decimals: the tie rounds down.
        assert_eq!(
            round_cash(Cash::from_float(1.005), 2, Rounding::HalfDown),
            Cash::from_float(1.0)
        );
        // Above the tie rounds up.
        assert_eq!(
            round_cash(Cash::from_float(1.006), 2, Rounding::HalfDown),
            Cash::from_float(1.01)
        );
    }

    #[test]
    fn test_half_even_ties_to_even() {
        assert_eq!(
            round_cash(Cash::from_float(1.005), 2, Rounding::HalfEven),
            Cash::from_float(1.0) // 1.00 is the even neighbour
        );
        assert_eq!(
            round_cash(Cash::from_float(1.015), 2, Rounding::HalfEven),
            Cash::from_float(1.02)
        );
    }

    #[test]
    fn test_full_precision_is_identity() {
        let v = Cash(123_456_789);
        assert_eq!(round_cash(v, 8, Rounding::HalfDown), v);
    }

    #[test]
    fn test_zero_decimals() {
        assert_eq!(
            round_cash(Cash::from_float(2.7), 0, Rounding::HalfDown),
            Cash::from_float(3.0)
        );
        assert_eq!(
            round_cash(Cash::from_float(2.5), 0, Rounding::HalfDown),
            Cash::from_float(2.0)
        );
    }

    #[test]
    fn test_negative_values() {
        // Euclidean split keeps negatives consistent: -1.5 ties down to -2.
        assert_eq!(
            round_cash(Cash::from_float(-1.5), 0, Rounding::HalfDown),
            Cash::from_float(-2.0)
        );
        assert_eq!(
            round_cash(Cash::from_float(-1.5), 0, Rounding::HalfEven),
            Cash::from_float(-2.0)
        );
    }

    #[test]
    fn test_round_to_lot() {
        let lot = Size::from_float(0.01);
        assert_eq!(
            round_to_lot(Size::from_float(0.1234), lot),
            Size::from_float(0.12)
        );
        assert_eq!(round_to_lot(Size::from_float(0.009), lot), Size::ZERO);
        assert_eq!(round_to_lot(Size::ONE, Size::ZERO), Size::ONE);
    }

    #[test]
    fn test_scale_sanity() {
        assert_eq!(SCALE, 100_000_000);
    }
}
