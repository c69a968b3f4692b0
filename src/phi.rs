//! # Phi — Legendre's Partial Sieve Function
//!
//! φ(x, a) counts the integers in `[1, x]` with no prime factor among the
//! first `a` primes. Unrolling Legendre's recurrence
//! `φ(x, a) = φ(x, a−1) − φ(x/p_a, a−1)` down to [`PhiTiny::MAX_A`] gives
//!
//! ```text
//! φ(x, a) = φ(x, 6) − Σ_{6 < i <= a} φ(x / p_i, i − 1)
//! ```
//!
//! and every subterm is expanded the same way until a shortcut applies:
//!
//! - `a <= 6`: [`PhiTiny`] lookup.
//! - `x < p_{a+1}`: only 1 survives.
//! - `x <= √x₀` and `p_{a+1}² > x`: the survivors are 1 and the primes in
//!   `(p_a, x]`, so `φ = π(x) − a + 1` from the π table.
//!
//! Once `x / p_i < p_i` inside a sum, that term and every later one is 1.
//! The top-level terms run in parallel.

use anyhow::Result;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::deleglise_rivat::pi_deleglise_rivat;
use crate::parallel::{build_pool, ideal_num_threads};
use crate::phi_tiny::{phi_tiny, PhiTiny};
use crate::pi_table::PiTable;
use crate::session::Session;
use crate::tables::make_primes;
use crate::wide::{isqrt, WideInt};

const THREAD_THRESHOLD: i64 = 100;

const TINY_A: usize = PhiTiny::MAX_A as usize;

/// φ(x, a). `a <= 0` leaves every integer in `[1, x]`.
pub fn phi<T: WideInt>(session: &Session, x: T, a: i64) -> Result<T> {
    if x < T::ONE {
        return Ok(T::ZERO);
    }
    if a <= 0 {
        return Ok(x);
    }
    if a <= TINY_A as i64 {
        return Ok(phi_tiny(x, a as u64));
    }

    let start = Instant::now();
    let sqrtx = isqrt(x).to_i64();
    let primes = make_primes(sqrtx);
    let pi = PiTable::new(sqrtx, &primes);
    let pi_sqrtx = pi.get(sqrtx);

    if a > pi_sqrtx {
        // p_a > √x: every composite <= x is already crossed off
        let pi_x = pi_deleglise_rivat(session, x)?;
        let a = T::from_i64(a);
        return Ok(if a >= pi_x { T::ONE } else { pi_x - a + T::ONE });
    }

    let threads = ideal_num_threads(session.threads(), a, THREAD_THRESHOLD);
    info!(x = %x, a, threads, "phi start");

    let legendre = Legendre { primes: &primes, pi: &pi };
    let pool = build_pool(threads)?;
    let sum: T = pool.install(|| {
        (TINY_A + 1..=a as usize)
            .into_par_iter()
            .map(|i| legendre.phi(x / T::from_i64(primes[i]), i - 1))
            .sum()
    });
    let result = phi_tiny(x, PhiTiny::MAX_A) - sum;

    info!(phi = %result, seconds = start.elapsed().as_secs_f64(), "phi done");
    Ok(result)
}

/// Primes and π table up to √x₀ of the top-level call.
struct Legendre<'a> {
    primes: &'a [i64],
    pi: &'a PiTable,
}

impl Legendre<'_> {
    fn phi<T: WideInt>(&self, x: T, a: usize) -> T {
        if x < T::ONE {
            return T::ZERO;
        }
        if a <= TINY_A {
            return phi_tiny(x, a as u64);
        }
        if a + 1 < self.primes.len() && x < T::from_i64(self.primes[a + 1]) {
            return T::ONE;
        }
        if x <= T::from_i64(self.pi.max()) {
            let n = x.to_i64();
            if a as i64 >= self.pi.get(isqrt(n)) {
                return T::from_i64((self.pi.get(n) - a as i64 + 1).max(1));
            }
        }

        let mut sum = phi_tiny(x, PhiTiny::MAX_A);
        for i in TINY_A + 1..=a {
            let p = T::from_i64(self.primes[i]);
            let xp = x / p;
            if xp < p {
                sum -= T::from_i64((a - i + 1) as i64);
                break;
            }
            sum -= self.phi(xp, i - 1);
        }
        sum
    }
}
