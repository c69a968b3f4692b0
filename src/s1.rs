//! # S1 — Ordinary Leaves
//!
//! `S1 = Σ μ(m) · φ(x / m, c)` over squarefree `m <= y` whose least prime
//! factor exceeds `p_c`. With c <= 6, each φ term is an O(1) [`PhiTiny`]
//! lookup, so the phase is a flat parallel reduction over m.
//!
//! [`PhiTiny`]: crate::phi_tiny::PhiTiny

use anyhow::Result;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::parallel::{build_pool, ideal_num_threads};
use crate::phi_tiny::phi_tiny;
use crate::session::Session;
use crate::tables::Tables;
use crate::wide::WideInt;

const THREAD_THRESHOLD: i64 = 1_000_000;

pub fn s1<T: WideInt>(session: &Session, x: T, y: i64, c: i64, tables: &Tables) -> Result<T> {
    let start = Instant::now();
    let threads = ideal_num_threads(session.threads(), y, THREAD_THRESHOLD);
    info!(x = %x, y, c, threads, "S1 start");

    let prime_c = tables.primes[c as usize];
    let pool = build_pool(threads)?;
    let sum: T = pool.install(|| {
        (1..=y as usize)
            .into_par_iter()
            .filter(|&m| tables.mu[m] != 0 && tables.lpf[m] > prime_c)
            .map(|m| {
                let phi = phi_tiny(x / T::from_i64(m as i64), c as u64);
                if tables.mu[m] > 0 {
                    phi
                } else {
                    -phi
                }
            })
            .sum()
    });

    info!(s1 = %sum, seconds = start.elapsed().as_secs_f64(), "S1 done");
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    /// Brute-force S1 with φ(x/m, c) by trial division.
    fn brute_s1(x: i64, y: i64, c: usize) -> i64 {
        let small = [2i64, 3, 5, 7, 11, 13];
        let phi = |n: i64| (1..=n).filter(|k| small[..c].iter().all(|p| k % p != 0)).count() as i64;
        let tables = Tables::new(y);
        (1..=y)
            .filter(|&m| {
                let m = m as usize;
                tables.mu[m] != 0 && (c == 0 || tables.lpf[m] > small[c - 1])
            })
            .map(|m| tables.mu[m as usize] as i64 * phi(x / m))
            .sum()
    }

    #[test]
    fn matches_brute_force() {
        let session = Session::new(Config { threads: 2, ..Config::default() });
        for &(x, y, c) in &[(10_000i64, 40i64, 3i64), (100_000, 60, 6), (54_321, 45, 5)] {
            let tables = Tables::new(y);
            let got = s1(&session, x, y, c, &tables).unwrap();
            assert_eq!(got, brute_s1(x, y, c as usize), "S1({}, {}, {})", x, y, c);
        }
    }

    #[test]
    fn i64_and_i128_agree() {
        let session = Session::default();
        let tables = Tables::new(500);
        let a = s1(&session, 10_000_000i64, 500, 6, &tables).unwrap();
        let b = s1(&session, 10_000_000i128, 500, 6, &tables).unwrap();
        assert_eq!(a as i128, b);
    }
}
