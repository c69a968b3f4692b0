//! Division by a runtime-invariant u64 via multiply-high.
//!
//! Lemire, Kaser, Kurz, "Faster Remainder by Direct Computation" (2019):
//! with `M = ceil(2^128 / d)`, `n / d = (M * n) >> 128` for every u64 `n`.
//! The 128x64 product is split into two 64x64 halves.

#[derive(Debug, Clone, Copy)]
pub struct FastDiv {
    magic: u128,
    divisor: u64,
}

impl FastDiv {
    pub fn new(divisor: u64) -> Self {
        assert!(divisor > 0, "division by zero");
        // d = 1 would need M = 2^128; handled separately in div()
        let magic = if divisor == 1 {
            0
        } else {
            u128::MAX / divisor as u128 + 1
        };
        FastDiv { magic, divisor }
    }

    #[inline]
    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    #[inline]
    pub fn div(&self, n: u64) -> u64 {
        if self.magic == 0 {
            return n;
        }
        let lo = self.magic as u64 as u128;
        let hi = self.magic >> 64;
        let n = n as u128;
        let t = ((lo * n) >> 64) + hi * n;
        (t >> 64) as u64
    }
}
