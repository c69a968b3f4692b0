//! # Prime Source — Segmented Prime Iteration and Counting
//!
//! Sequential access to primes beyond the range the arithmetic tables cover.
//! Both [`PrimeIter`] and [`PrimeCounter`] walk the number line in fixed-size
//! segments, so memory stays at O(√stop + segment) regardless of the range.
//!
//! Each segment is initialized with [`BitSieve::pre_sieve`] (multiples of
//! 2..19 removed, the primes themselves kept), then the remaining sieving
//! primes up to √high cross off their odd multiples.

use crate::sieve::{generate_primes, BitSieve};
use crate::wide::isqrt;

/// Bits per segment. 2^18 bits = 32 KiB, about one L1 data cache.
const SEGMENT_SIZE: u64 = 1 << 18;

/// Largest pre-sieved prime; sieving starts above it.
const PRE_SIEVED_MAX: u64 = 19;

/// Load the primality of `[low, high]` into `sieve`: bit `i` is set iff
/// `low + i` is prime. `primes` must contain every prime up to √high.
fn sieve_segment(sieve: &mut BitSieve, low: u64, high: u64, primes: &[u64]) {
    debug_assert!(high - low < sieve.len() as u64);
    sieve.pre_sieve(8, low, true);

    for &p in primes.iter().skip_while(|&&p| p <= PRE_SIEVED_MAX) {
        if p * p > high {
            break;
        }
        let mut multiple = (low.div_ceil(p) * p).max(p * p);
        if multiple % 2 == 0 {
            multiple += p;
        }
        while multiple <= high {
            sieve.unset((multiple - low) as usize);
            multiple += 2 * p;
        }
    }

    // 1 survives the pre-sieve
    if low <= 1 && high >= 1 {
        sieve.unset((1 - low) as usize);
    }
}

fn sieving_primes(stop: u64) -> Vec<u64> {
    generate_primes(isqrt(stop as i64) as u64)
}

/// Lazy, restartable iterator over the primes in `[start, stop]`.
///
/// ```
/// use primecount::prime_source::PrimeIter;
/// let primes: Vec<u64> = PrimeIter::new(10, 30).collect();
/// assert_eq!(primes, vec![11, 13, 17, 19, 23, 29]);
/// ```
pub struct PrimeIter {
    primes: Vec<u64>,
    sieve: BitSieve,
    start: u64,
    low: u64,
    stop: u64,
    buffer: Vec<u64>,
    pos: usize,
    done: bool,
}

impl PrimeIter {
    /// `stop` must fit `i64`.
    pub fn new(start: u64, stop: u64) -> Self {
        debug_assert!(stop <= i64::MAX as u64);
        let len = SEGMENT_SIZE.min(stop.saturating_sub(start) + 1) as usize;
        PrimeIter {
            primes: sieving_primes(stop),
            sieve: BitSieve::new_all_clear(len),
            start,
            low: start,
            stop,
            buffer: Vec::with_capacity(len / 8),
            pos: 0,
            done: start > stop,
        }
    }

    /// Rewind to the first prime `>= start`.
    pub fn restart(&mut self) {
        self.low = self.start;
        self.buffer.clear();
        self.pos = 0;
        self.done = self.start > self.stop;
    }

    fn fill_buffer(&mut self) {
        let high = (self.low + self.sieve.len() as u64 - 1).min(self.stop);
        sieve_segment(&mut self.sieve, self.low, high, &self.primes);

        let low = self.low;
        self.buffer.clear();
        self.buffer.extend(
            self.sieve
                .iter_set_bits()
                .map(|i| low + i as u64)
                .take_while(|&n| n <= high),
        );
        self.pos = 0;

        if high >= self.stop {
            self.done = true;
        } else {
            self.low = high + 1;
        }
    }
}

impl Iterator for PrimeIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if let Some(&p) = self.buffer.get(self.pos) {
                self.pos += 1;
                return Some(p);
            }
            if self.done {
                return None;
            }
            self.fill_buffer();
        }
    }
}

/// Answers π(n) for a non-decreasing sequence of `n <= max`.
///
/// Only one segment is held at a time; a query beyond the current segment
/// sieves forward, adding each completed segment's popcount to the running
/// base. Queries below the current segment are a logic error.
pub struct PrimeCounter {
    primes: Vec<u64>,
    sieve: BitSieve,
    max: u64,
    low: u64,
    high: u64,
    count_below: u64,
}

impl PrimeCounter {
    pub fn new(max: u64) -> Self {
        let primes = sieving_primes(max);
        let len = SEGMENT_SIZE.min(max + 1) as usize;
        let mut sieve = BitSieve::new_all_clear(len);
        let high = (len as u64 - 1).min(max);
        sieve_segment(&mut sieve, 0, high, &primes);
        PrimeCounter {
            primes,
            sieve,
            max,
            low: 0,
            high,
            count_below: 0,
        }
    }

    pub fn pi(&mut self, n: u64) -> u64 {
        assert!(n <= self.max, "PrimeCounter query {} > max {}", n, self.max);
        debug_assert!(n >= self.low, "PrimeCounter queries must be non-decreasing");

        while n > self.high {
            self.count_below += self.sieve.count(0, (self.high - self.low) as usize);
            self.low = self.high + 1;
            self.high = (self.low + self.sieve.len() as u64 - 1).min(self.max);
            sieve_segment(&mut self.sieve, self.low, self.high, &self.primes);
        }

        self.count_below + self.sieve.count(0, (n - self.low) as usize)
    }
}

/// π(x) by segmented sieving. O(x log log x); meant for small x and tests.
pub fn count_primes(x: u64) -> u64 {
    if x < 2 {
        return 0;
    }
    PrimeCounter::new(x).pi(x)
}
