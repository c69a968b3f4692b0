//! # P3 — Integers With Exactly Three Prime Factors Above p_a
//!
//! `P3(x, a) = Σ_{a < i <= c} Σ_{i <= j <= b_i} (π(x / (p_i·p_j)) − (j − 1))`
//! with `c = π(∛x)` and `b_i = π(√(x/p_i))`. Used by Lehmer's formula,
//! where `a = π(x^(1/4))`.
//!
//! For `p_i > x^(1/4)` every argument `x / (p_i·p_j)` is below √x, so one
//! π table up to √x answers every lookup.

use anyhow::Result;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::parallel::{build_pool, ideal_num_threads};
use crate::pi_table::PiTable;
use crate::session::Session;
use crate::tables::make_primes;
use crate::wide::{iroot, isqrt, WideInt};

const THREAD_THRESHOLD: i64 = 100;

pub fn p3<T: WideInt>(session: &Session, x: T, a: i64) -> Result<T> {
    let start = Instant::now();
    let sqrtx = isqrt(x).to_i64();
    let primes = make_primes(sqrtx);
    let pi = PiTable::new(sqrtx, &primes);
    let c = pi.get(iroot(x, 3).to_i64());
    if a >= c {
        return Ok(T::ZERO);
    }

    let threads = ideal_num_threads(session.threads(), c - a, THREAD_THRESHOLD);
    info!(x = %x, a, c, threads, "P3 start");

    let pool = build_pool(threads)?;
    let sum: T = pool.install(|| {
        (a.max(0) as usize + 1..=c as usize)
            .into_par_iter()
            .map(|i| {
                let xi = x / T::from_i64(primes[i]);
                let bi = pi.get(isqrt(xi).to_i64()) as usize;
                let mut sum = T::ZERO;
                for (j, &p) in primes.iter().enumerate().take(bi + 1).skip(i) {
                    let n = (xi / T::from_i64(p)).to_i64();
                    sum += T::from_i64(pi.get(n) - (j as i64 - 1));
                }
                sum
            })
            .sum()
    });

    info!(p3 = %sum, seconds = start.elapsed().as_secs_f64(), "P3 done");
    Ok(sum)
}
