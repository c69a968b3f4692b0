//! Random-access π(n) lookup for `0 <= n <= max`.

/// Dense table of prime counts. `u32` entries hold π(n) for any table size
/// that fits in memory.
#[derive(Debug, Clone)]
pub struct PiTable {
    pi: Vec<u32>,
}

impl PiTable {
    /// Build from an ascending list of primes (0-indexed or 1-indexed with a
    /// leading 0; non-primes below 2 are skipped).
    pub fn new(max: i64, primes: &[i64]) -> Self {
        assert!(max >= 0, "PiTable max must be non-negative, got {}", max);
        let mut pi = vec![0u32; max as usize + 1];
        let mut count = 0u32;
        let mut next = primes.iter().copied().filter(|&p| p >= 2).peekable();

        for (n, slot) in pi.iter_mut().enumerate() {
            if next.peek() == Some(&(n as i64)) {
                count += 1;
                next.next();
            }
            *slot = count;
        }
        PiTable { pi }
    }

    #[inline]
    pub fn get(&self, n: i64) -> i64 {
        debug_assert!(
            n >= 0 && (n as usize) < self.pi.len(),
            "PiTable index {} out of range 0..{}",
            n,
            self.pi.len()
        );
        self.pi[n as usize] as i64
    }

    /// Largest n the table answers.
    pub fn max(&self) -> i64 {
        self.pi.len() as i64 - 1
    }
}
