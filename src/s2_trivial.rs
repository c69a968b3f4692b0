//! # S2 Trivial — Leaves With φ(x/n, b−1) = 1
//!
//! For a prime `p > max(p_c, √z)` every leaf `n = p·q` with
//! `q > max(x/p², p)` has `x/n < p`, so only 1 survives the sieve of the
//! first b−1 primes and the leaf contributes exactly 1. Per prime that is
//! `π(y) − π(max(x/p², p))` leaves in closed form.
//!
//! Primes come from a lazy [`PrimeIter`]; workers claim fixed-width chunks of
//! `[start, y]` from a shared [`WorkCursor`].

use anyhow::Result;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::checkpoint::PhaseKey;
use crate::parallel::{build_pool, ideal_num_threads, WorkCursor};
use crate::prime_source::PrimeIter;
use crate::session::{seconds_since, Session};
use crate::tables::Tables;
use crate::wide::{isqrt, min_i64, WideInt};

const PHASE: &str = "S2_trivial";
const THREAD_THRESHOLD: i64 = 10_000_000;
const CHUNK: i64 = 1 << 20;

pub fn s2_trivial<T: WideInt>(
    session: &Session,
    x: T,
    y: i64,
    z: i64,
    c: i64,
    tables: &Tables,
) -> Result<T> {
    let start_time = Instant::now();
    let key = PhaseKey::new(x, y, z).with_c(c);
    let mut doc = session.load_backup();

    if doc.is_resume(PHASE, &key) {
        if let Some(s2) = doc.get_wide::<T>(PHASE, "s2_trivial") {
            info!(s2_trivial = %s2, "S2_trivial resumed from checkpoint");
            return Ok(s2);
        }
    }

    let threads = ideal_num_threads(session.threads(), y, THREAD_THRESHOLD);
    info!(x = %x, y, c, threads, "S2_trivial start");

    let pi = &tables.pi;
    let pi_y = tables.pi_y();
    let prime_c = tables.primes[c as usize];
    let (start, stop) = session
        .partitioner()
        .assign(prime_c.max(isqrt(z)) + 1, y);

    let progress = session.progress();
    progress.begin(PHASE, (stop - start + 1).max(0) as u64);
    let cursor = WorkCursor::new(start, stop);

    let pool = build_pool(threads)?;
    let local: T = pool.install(|| {
        (0..threads)
            .into_par_iter()
            .map(|_| {
                let mut sum = T::ZERO;
                while let Some((low, high)) = cursor.claim(CHUNK) {
                    for prime in PrimeIter::new(low as u64, high as u64) {
                        let p = prime as i64;
                        let xn = min_i64(x / (T::from_i64(p) * T::from_i64(p)), y).max(p);
                        sum += T::from_i64(pi_y - pi.get(xn));
                    }
                    progress.advance((high - low + 1) as u64);
                }
                sum
            })
            .sum()
    });

    let s2 = T::from_i128(session.partitioner().reduce(local.to_i128()));

    doc.erase(PHASE);
    doc.write_key(PHASE, &key);
    doc.set_wide(PHASE, "s2_trivial", s2);
    doc.set_f64(PHASE, "percent", 100.0);
    doc.set_f64(PHASE, "seconds", seconds_since(start_time));
    session.store_backup(&doc)?;

    info!(s2_trivial = %s2, seconds = start_time.elapsed().as_secs_f64(), "S2_trivial done");
    Ok(s2)
}
