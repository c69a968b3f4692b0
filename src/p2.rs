//! # P2 — Integers With Exactly Two Prime Factors Above y
//!
//! `P2(x, y) = Σ_{y < p <= √x} (π(x/p) − π(p) + 1)`.
//!
//! Primes p are produced in descending chunks, so `x/p` ascends and a single
//! [`PrimeCounter`] can answer every π(x/p) in one forward sweep. The π(p)
//! part telescopes: the k primes above y have ranks π(y)+1 ... π(y)+k, so
//! `Σ (π(p) − 1) = k·(π(y) − 1) + k(k+1)/2`.
//!
//! Checkpointed as a whole: the result is stored on completion and reused
//! on a matching rerun.

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::checkpoint::PhaseKey;
use crate::prime_source::{PrimeCounter, PrimeIter};
use crate::session::{seconds_since, Session};
use crate::wide::{isqrt, WideInt};

const PHASE: &str = "P2";

/// Width of one descending prime chunk.
const CHUNK: u64 = 1 << 20;

pub fn p2<T: WideInt>(session: &Session, x: T, y: i64, z: i64, pi_y: i64) -> Result<T> {
    let start = Instant::now();
    let key = PhaseKey::new(x, y, z);
    let mut doc = session.load_backup();

    if doc.is_resume(PHASE, &key) {
        if let Some(p2) = doc.get_wide::<T>(PHASE, "p2") {
            info!(p2 = %p2, "P2 resumed from checkpoint");
            return Ok(p2);
        }
    }

    info!(x = %x, y, "P2 start");
    let sqrtx = isqrt(x).to_i64();
    let progress = session.progress();
    progress.begin(PHASE, (sqrtx - y).max(0) as u64);

    let mut sum = T::ZERO;
    let mut k: i64 = 0;

    if sqrtx > y {
        let max_query = (x / T::from_i64(y + 1)).to_i64() as u64;
        let mut counter = PrimeCounter::new(max_query);
        let mut hi = sqrtx as u64;
        let lowest = y as u64 + 1;

        loop {
            let lo = hi.saturating_sub(CHUNK - 1).max(lowest);
            let mut primes: Vec<u64> = PrimeIter::new(lo, hi).collect();
            primes.reverse();
            for p in primes {
                let xp = (x / T::from_i64(p as i64)).to_i64() as u64;
                sum += T::from_i64(counter.pi(xp) as i64);
                k += 1;
            }
            progress.advance(hi - lo + 1);
            if lo == lowest {
                break;
            }
            hi = lo - 1;
        }
    }

    let k_wide = T::from_i64(k);
    sum -= k_wide * T::from_i64(pi_y - 1) + k_wide * (k_wide + T::ONE) / T::from_i64(2);

    doc.erase(PHASE);
    doc.write_key(PHASE, &key);
    doc.set_wide(PHASE, "p2", sum);
    doc.set_f64(PHASE, "percent", 100.0);
    doc.set_f64(PHASE, "seconds", seconds_since(start));
    session.store_backup(&doc)?;

    info!(p2 = %sum, seconds = start.elapsed().as_secs_f64(), "P2 done");
    Ok(sum)
}
