//! # Wide — Integer Width Abstraction and Integer Math
//!
//! Every phase of the computation is generic over [`WideInt`], instantiated
//! for `i64` (native width, x < 2^63) and `i128` (software-emulated on
//! 64-bit targets, x up to 10^31). Only `x` and the accumulated sums need the
//! wide type; `y`, `z`, primes and sieve positions always fit `i64`.
//!
//! Also hosts the small integer helpers (`iroot`, `isqrt`, `ceil_div`,
//! `in_between`, `next_power_of_2`) shared by the leaf engines.

use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Rem, Sub, SubAssign};
use std::str::FromStr;

/// Signed integer type wide enough to hold `x` and the S1/S2/P2 sums.
pub trait WideInt:
    Copy
    + Ord
    + Default
    + Send
    + Sync
    + Debug
    + Display
    + FromStr
    + Sum
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Rem<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const MAX: Self;

    fn from_i64(n: i64) -> Self;
    /// Saturating conversion from a float estimate.
    fn from_f64(f: f64) -> Self;
    fn from_i128(n: i128) -> Self;
    /// Narrowing conversion. The caller guarantees the value fits `i64`.
    fn to_i64(self) -> i64;
    fn to_i128(self) -> i128;
    /// `Some` if the value is non-negative and fits `u64`.
    fn to_u64(self) -> Option<u64>;
    fn to_f64(self) -> f64;
    fn checked_mul(self, rhs: Self) -> Option<Self>;
    fn checked_pow(self, exp: u32) -> Option<Self>;
}

macro_rules! impl_wide_int {
    ($t:ty) => {
        impl WideInt for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const MAX: Self = <$t>::MAX;

            #[inline]
            fn from_i64(n: i64) -> Self {
                n as $t
            }

            #[inline]
            fn from_f64(f: f64) -> Self {
                f as $t
            }

            #[inline]
            fn from_i128(n: i128) -> Self {
                n as $t
            }

            #[inline]
            fn to_i64(self) -> i64 {
                debug_assert!(
                    self as i128 >= i64::MIN as i128 && self as i128 <= i64::MAX as i128,
                    "{} does not fit i64",
                    self
                );
                self as i64
            }

            #[inline]
            fn to_i128(self) -> i128 {
                self as i128
            }

            #[inline]
            fn to_u64(self) -> Option<u64> {
                u64::try_from(self).ok()
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn checked_mul(self, rhs: Self) -> Option<Self> {
                <$t>::checked_mul(self, rhs)
            }

            #[inline]
            fn checked_pow(self, exp: u32) -> Option<Self> {
                <$t>::checked_pow(self, exp)
            }
        }
    };
}

impl_wide_int!(i64);
impl_wide_int!(i128);

/// Integer n-th root: the largest r with r^n <= x.
///
/// Starts from the floating-point estimate and corrects it, so the result is
/// exact even where `f64` has fewer significant bits than `T`.
pub fn iroot<T: WideInt>(x: T, n: u32) -> T {
    if x <= T::ZERO {
        return T::ZERO;
    }
    let mut r = T::from_f64(x.to_f64().powf(1.0 / n as f64));
    while r > T::ZERO && r.checked_pow(n).map_or(true, |v| v > x) {
        r -= T::ONE;
    }
    while (r + T::ONE).checked_pow(n).is_some_and(|v| v <= x) {
        r += T::ONE;
    }
    r
}

#[inline]
pub fn isqrt<T: WideInt>(x: T) -> T {
    iroot(x, 2)
}

/// `min(a, b)` where `a` may exceed the `i64` range.
#[inline]
pub fn min_i64<T: WideInt>(a: T, b: i64) -> i64 {
    if a < T::from_i64(b) {
        a.to_i64()
    } else {
        b
    }
}

#[inline]
pub fn ceil_div(a: i64, b: i64) -> i64 {
    debug_assert!(a >= 0 && b > 0);
    (a + b - 1) / b
}

/// Clamp `x` into `[min, max]`. Unlike `Ord::clamp` this never panics:
/// when `min > max` the lower bound wins.
#[inline]
pub fn in_between(min: i64, x: i64, max: i64) -> i64 {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

#[inline]
pub fn next_power_of_2(n: i64) -> i64 {
    (n.max(1) as u64).next_power_of_two() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iroot_exact_at_perfect_powers() {
        assert_eq!(iroot(1_000_000_000i64, 3), 1000);
        assert_eq!(iroot(999_999_999i64, 3), 999);
        assert_eq!(iroot(1_000_000_001i64, 3), 1000);
        assert_eq!(iroot(64i64, 6), 2);
        assert_eq!(iroot(63i64, 6), 1);
    }

    #[test]
    fn isqrt_near_i64_max() {
        // 3037000499^2 < 2^63 - 1 < 3037000500^2
        assert_eq!(isqrt(i64::MAX), 3_037_000_499);
    }

    #[test]
    fn isqrt_i128_beyond_f64_precision() {
        let r: i128 = 10_000_000_000_000_019; // ~1e16, not exactly representable as f64 square
        assert_eq!(isqrt(r * r), r);
        assert_eq!(isqrt(r * r - 1), r - 1);
        assert_eq!(isqrt(r * r + 2 * r), r);
    }

    #[test]
    fn iroot_small_and_zero() {
        assert_eq!(iroot(0i64, 3), 0);
        assert_eq!(iroot(1i64, 3), 1);
        assert_eq!(iroot(7i64, 3), 1);
        assert_eq!(iroot(8i64, 3), 2);
        assert_eq!(isqrt(-5i64), 0);
    }

    #[test]
    fn min_i64_handles_wide_values() {
        assert_eq!(min_i64(10i128.pow(30), 77), 77);
        assert_eq!(min_i64(5i128, 77), 5);
        assert_eq!(min_i64(77i64, 77), 77);
    }

    #[test]
    fn in_between_prefers_lower_bound() {
        assert_eq!(in_between(5, 3, 10), 5);
        assert_eq!(in_between(5, 30, 10), 10);
        assert_eq!(in_between(5, 7, 10), 7);
        assert_eq!(in_between(10, 7, 5), 10);
    }

    #[test]
    fn next_power_of_2_rounds_up() {
        assert_eq!(next_power_of_2(0), 1);
        assert_eq!(next_power_of_2(1), 1);
        assert_eq!(next_power_of_2(5), 8);
        assert_eq!(next_power_of_2(1024), 1024);
        assert_eq!(next_power_of_2(1025), 2048);
    }

    #[test]
    fn to_u64_rejects_negative_and_oversized() {
        assert_eq!((-1i64).to_u64(), None);
        assert_eq!((1i128 << 64).to_u64(), None);
        assert_eq!(((1i128 << 64) - 1).to_u64(), Some(u64::MAX));
    }

    #[test]
    fn ceil_div_basic() {
        assert_eq!(ceil_div(10, 3), 4);
        assert_eq!(ceil_div(9, 3), 3);
        assert_eq!(ceil_div(1, 7), 1);
        assert_eq!(ceil_div(0, 7), 0);
    }
}
