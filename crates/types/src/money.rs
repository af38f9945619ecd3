//! Fixed-point monetary types.
//!
//! Prices, sizes, and cash balances use fixed-point arithmetic with eight
//! decimal places so book keys order exactly and replay is bit-stable.
//! Floating point appears only at the conversion edges.

use derive_more::{Add, AddAssign, From, Into, Neg, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

/// Fixed-point scale: 100,000,000 raw units = 1.0 (eight decimal places).
pub const SCALE: i64 = 100_000_000;

// =============================================================================
// Price
// =============================================================================

/// Fixed-point price with eight decimal places.
///
/// # Examples
/// - `Price(100_000_000)` = 1.0
/// - `Price(150_000_000)` = 1.5
/// - `Price(1)` = 0.00000001 (smallest increment)
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    From,
    Into,
)]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Create a Price from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if price is strictly positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        Price(self.0.max(other.0))
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        Price(self.0.min(other.0))
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({:.8})", self.to_float())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_float())
    }
}

// =============================================================================
// Size
// =============================================================================

/// Order/fill size with eight decimal places (fractional sizes are normal
/// for crypto instruments).
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Size(pub i64);

impl Size {
    pub const ZERO: Size = Size(0);
    /// One whole unit (1.0).
    pub const ONE: Size = Size(SCALE);

    /// Create a Size from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if strictly positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Saturating subtraction (never below zero).
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Size(self.0.saturating_sub(rhs.0).max(0))
    }

    /// Minimum of two sizes.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Size(self.0.min(other.0))
    }
}

impl fmt::Debug for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Size({:.8})", self.to_float())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_float())
    }
}

// =============================================================================
// Cash
// =============================================================================

/// Fixed-point cash amount with eight decimal places.
///
/// Semantically identical to Price but represents balances and fees.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Cash(pub i64);

impl Cash {
    pub const ZERO: Cash = Cash(0);

    /// Create Cash from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Debug for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cash({:.8})", self.to_float())
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_float())
    }
}

// =============================================================================
// Price-Size Operations
// =============================================================================

impl Mul<Size> for Price {
    type Output = Cash;

    /// Multiply price by size to get notional cash value.
    ///
    /// Computed in 128-bit to avoid overflow before rescaling.
    fn mul(self, size: Size) -> Cash {
        Cash((self.0 as i128 * size.0 as i128 / SCALE as i128) as i64)
    }
}

impl Mul<Price> for Size {
    type Output = Cash;

    fn mul(self, price: Price) -> Cash {
        price * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_float() {
        assert_eq!(Price::from_float(1.0), Price(100_000_000));
        assert_eq!(Price::from_float(1.5), Price(150_000_000));
        assert_eq!(Price::from_float(0.00000001), Price(1));
    }

    #[test]
    fn test_price_arithmetic() {
        let p1 = Price::from_float(10.0);
        let p2 = Price::from_float(3.5);

        assert_eq!((p1 + p2).to_float(), 13.5);
        assert_eq!((p1 - p2).to_float(), 6.5);
    }

    #[test]
    fn test_notional() {
        // 100.0 * 2.5 = 250.0
        let total = Price::from_float(100.0) * Size::from_float(2.5);
        assert_eq!(total, Cash::from_float(250.0));

        // Fractional both ways: 0.5 * 0.5 = 0.25
        let small = Price::from_float(0.5) * Size::from_float(0.5);
        assert_eq!(small, Cash::from_float(0.25));
    }

    #[test]
    fn test_notional_no_overflow() {
        // Large price times large size stays exact via the i128 path.
        let total = Price::from_float(50_000.0) * Size::from_float(10_000.0);
        assert_eq!(total, Cash::from_float(500_000_000.0));
    }

    #[test]
    fn test_size_saturating_sub() {
        let a = Size::from_float(1.0);
        let b = Size::from_float(2.5);
        assert_eq!(a.saturating_sub(b), Size::ZERO);
        assert_eq!(b.saturating_sub(a), Size::from_float(1.5));
    }
}
