//! # PhiTiny — φ(x, a) for a <= 6 in O(1)
//!
//! φ(x, a) counts the integers in `[1, x]` not divisible by any of the first
//! `a` primes. The sieve pattern of the first `a` primes repeats with period
//! `pp = p1·p2·...·pa` (the primorial), and each period holds `φ(pp)` survivors
//! (the totient), so
//!
//! ```text
//! φ(x, a) = (x / pp) · φ(pp) + φ(x mod pp, a)
//! ```
//!
//! where the last term comes from a table of length `pp`. For a = 6 the table
//! has 30030 entries, all `< 5760`, so `u16` suffices.

use std::sync::OnceLock;

use crate::wide::WideInt;

const PRIMES: [u64; 7] = [0, 2, 3, 5, 7, 11, 13];
const PRIMORIALS: [u64; 7] = [1, 2, 6, 30, 210, 2310, 30030];
const TOTIENTS: [u64; 7] = [1, 1, 2, 8, 48, 480, 5760];

pub struct PhiTiny {
    tables: Vec<Vec<u16>>,
}

static PHI_TINY: OnceLock<PhiTiny> = OnceLock::new();

impl PhiTiny {
    /// Largest `a` answered from the tables.
    pub const MAX_A: u64 = 6;

    fn new() -> Self {
        let mut tables: Vec<Vec<u16>> = Vec::with_capacity(PRIMES.len());
        tables.push(vec![0]);

        for a in 1..PRIMES.len() {
            let pp = PRIMORIALS[a] as usize;
            let p = PRIMES[a] as usize;
            let mut table = vec![0u16; pp];
            for (n, slot) in table.iter_mut().enumerate().skip(1) {
                // φ(n, a) = φ(n, a - 1) - φ(n / p, a - 1)
                let phi = phi_from(&tables[a - 1], a - 1, n as u64)
                    - phi_from(&tables[a - 1], a - 1, (n / p) as u64);
                *slot = phi as u16;
            }
            tables.push(table);
        }
        PhiTiny { tables }
    }

    pub fn get() -> &'static PhiTiny {
        PHI_TINY.get_or_init(PhiTiny::new)
    }

    /// φ(x, a) for `x >= 0` and `a <= MAX_A`.
    pub fn phi<T: WideInt>(&self, x: T, a: u64) -> T {
        assert!(a <= Self::MAX_A, "PhiTiny supports a <= {}, got {}", Self::MAX_A, a);
        if x <= T::ZERO {
            return T::ZERO;
        }
        let a = a as usize;
        let pp = T::from_i64(PRIMORIALS[a] as i64);
        let q = x / pp;
        let r = (x % pp).to_i64() as usize;
        q * T::from_i64(TOTIENTS[a] as i64) + T::from_i64(self.tables[a][r] as i64)
    }
}

fn phi_from(table: &[u16], a: usize, n: u64) -> u64 {
    (n / PRIMORIALS[a]) * TOTIENTS[a] + table[(n % PRIMORIALS[a]) as usize] as u64
}

/// φ(x, a) via the shared tables.
#[inline]
pub fn phi_tiny<T: WideInt>(x: T, a: u64) -> T {
    PhiTiny::get().phi(x, a)
}
