//! Fixed-point arithmetic for MLFQS
//!
//! Values are stored as `i32` with `FRAC` fractional bits. Products and
//! quotients of two fixed-point values go through an `i64` intermediate so
//! the shift never overflows the native word.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use crate::scheduler::config::FIXED_FRACTION_BITS;

/// Signed fixed-point number with `FRAC` fractional bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed<const FRAC: u32>(i32);

/// The representation used by the scheduler (17.14).
pub type Fp = Fixed<FIXED_FRACTION_BITS>;

impl<const FRAC: u32> Fixed<FRAC> {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRAC);

    #[inline]
    pub const fn from_int(n: i32) -> Self {
        Self(n << FRAC)
    }

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Integer part, rounding toward zero.
    #[inline]
    pub const fn to_int_trunc(self) -> i32 {
        self.0 / (1 << FRAC)
    }

    /// Integer part, rounding to nearest.
    #[inline]
    pub const fn to_int_round(self) -> i32 {
        let half = 1 << (FRAC - 1);
        if self.0 >= 0 {
            (self.0 + half) / (1 << FRAC)
        } else {
            (self.0 - half) / (1 << FRAC)
        }
    }

    /// `self * n` for an integer `n`.
    #[inline]
    pub const fn mul_int(self, n: i32) -> Self {
        Self(self.0 * n)
    }

    /// `self / n` for an integer `n`.
    #[inline]
    pub const fn div_int(self, n: i32) -> Self {
        Self(self.0 / n)
    }

    /// `self + n` for an integer `n`.
    #[inline]
    pub const fn add_int(self, n: i32) -> Self {
        Self(self.0 + (n << FRAC))
    }

    /// Value scaled by 100 and truncated, as reported to user programs.
    #[inline]
    pub const fn to_hundredths(self) -> i32 {
        ((self.0 as i64) * 100 / (1i64 << FRAC)) as i32
    }
}

impl<const FRAC: u32> Add for Fixed<FRAC> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl<const FRAC: u32> AddAssign for Fixed<FRAC> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl<const FRAC: u32> Sub for Fixed<FRAC> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl<const FRAC: u32> Neg for Fixed<FRAC> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl<const FRAC: u32> Mul for Fixed<FRAC> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(((self.0 as i64) * (rhs.0 as i64) / (1i64 << FRAC)) as i32)
    }
}

impl<const FRAC: u32> Div for Fixed<FRAC> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self((((self.0 as i64) << FRAC) / rhs.0 as i64) as i32)
    }
}

impl<const FRAC: u32> fmt::Debug for Fixed<FRAC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({}/100)", self.to_hundredths())
    }
}

impl<const FRAC: u32> fmt::Display for Fixed<FRAC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.to_hundredths();
        let sign = if h < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (h / 100).abs(), (h % 100).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_int_conversions() {
        assert_eq!(Fp::from_int(5).to_int_trunc(), 5);
        assert_eq!(Fp::from_int(-5).to_int_trunc(), -5);
        assert_eq!(Fp::ONE.raw(), 1 << 14);
    }

    #[test]
    fn test_rounding() {
        let two_and_half = Fp::from_int(5) / Fp::from_int(2);
        assert_eq!(two_and_half.to_int_trunc(), 2);
        assert_eq!(two_and_half.to_int_round(), 3);
        assert_eq!((-two_and_half).to_int_trunc(), -2);
        assert_eq!((-two_and_half).to_int_round(), -3);
    }

    #[test]
    fn test_mul_div_do_not_overflow_native_word() {
        // raw(100) * raw(100) does not fit in an i32.
        let big = Fp::from_int(100);
        assert_eq!((big * big).to_int_trunc(), 10_000);
        assert_eq!((big / Fp::from_int(8)).to_int_trunc(), 12);
    }

    #[test]
    fn test_hundredths() {
        let third = Fp::ONE / Fp::from_int(3);
        assert_eq!(third.to_hundredths(), 33);
        assert_eq!(format!("{}", Fp::from_int(3) / Fp::from_int(2)), "1.50");
    }

    #[test]
    fn test_hundredths_of_large_values() {
        // raw(2000) * 100 does not fit in an i32.
        assert_eq!(Fp::from_int(2000).to_hundredths(), 200_000);
        assert_eq!(Fp::from_int(-100_000).to_hundredths(), -10_000_000);
        assert_eq!(format!("{}", Fp::from_int(1556)), "1556.00");
    }

    proptest! {
        #[test]
        fn prop_mul_by_one_is_identity(raw in -(1i32 << 28)..(1i32 << 28)) {
            let x = Fp::from_raw(raw);
            prop_assert_eq!(x * Fp::ONE, x);
            prop_assert_eq!(x / Fp::ONE, x);
        }

        #[test]
        fn prop_int_arithmetic_matches_integers(a in -300i32..300, b in 1i32..300) {
            prop_assert_eq!((Fp::from_int(a) * Fp::from_int(b)).to_int_trunc(), a * b);
            prop_assert_eq!(Fp::from_int(a).add_int(b).to_int_trunc(), a + b);
            prop_assert_eq!(Fp::from_int(a).div_int(b).to_int_trunc(), a / b);
        }
    }
}
