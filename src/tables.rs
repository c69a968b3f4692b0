//! # Tables — Primes, Möbius and Least Prime Factor up to y
//!
//! Built once per computation, shared read-only across all worker threads.
//!
//! - `primes`: 1-indexed, `primes[0] = 0`, `primes[b]` is the b-th prime.
//! - `lpf[n]`: least prime factor of n, with `lpf[1] = i64::MAX` so that the
//!   leaf condition `p < lpf[m]` holds for m = 1.
//! - `mu[n]`: Möbius function, derived from `lpf` in one linear pass.
//!
//! The least-prime-factor table comes from a linear sieve: every composite is
//! written exactly once, by its least prime factor.

use crate::pi_table::PiTable;
use crate::sieve::generate_primes;

/// Precomputed arithmetic tables for all n <= y.
pub struct Tables {
    pub primes: Vec<i64>,
    pub pi: PiTable,
    pub mu: Vec<i8>,
    pub lpf: Vec<i64>,
}

impl Tables {
    pub fn new(y: i64) -> Self {
        assert!(y > 0, "y must be positive, got {}", y);
        let primes = make_primes(y);
        let pi = PiTable::new(y, &primes);
        let lpf = make_least_prime_factor(y);
        let mu = make_moebius(&lpf);
        Tables { primes, pi, mu, lpf }
    }

    /// π(y).
    pub fn pi_y(&self) -> i64 {
        self.primes.len() as i64 - 1
    }
}

/// Primes up to `limit`, 1-indexed with a leading 0.
pub fn make_primes(limit: i64) -> Vec<i64> {
    let mut primes = vec![0i64];
    if limit >= 2 {
        primes.extend(generate_primes(limit as u64).into_iter().map(|p| p as i64));
    }
    primes
}

pub fn make_least_prime_factor(max: i64) -> Vec<i64> {
    let n_max = max.max(1) as usize;
    let mut lpf = vec![0i64; n_max + 1];
    let mut primes: Vec<usize> = Vec::new();

    for i in 2..=n_max {
        if lpf[i] == 0 {
            lpf[i] = i as i64;
            primes.push(i);
        }
        let lpf_i = lpf[i];
        for &p in &primes {
            if p as i64 > lpf_i || i * p > n_max {
                break;
            }
            lpf[i * p] = p as i64;
        }
    }

    lpf[1] = i64::MAX;
    lpf
}

pub fn make_moebius(lpf: &[i64]) -> Vec<i8> {
    let mut mu = vec![0i8; lpf.len()];
    if mu.len() > 1 {
        mu[1] = 1;
    }
    for n in 2..lpf.len() {
        let p = lpf[n] as usize;
        let m = n / p;
        mu[n] = if m % p == 0 { 0 } else { -mu[m] };
    }
    mu
}
