//! # S2 Easy — Clustered and Sparse Easy Leaves
//!
//! For `π(√y) < b <= π(x^(1/3))` the leaves `n = p_b · p_l` with
//! `x/n < y` need no sieve: because `x/n < p_b²`,
//! `φ(x/n, b−1) = π(x/n) − b + 2`, a single [`PiTable`] lookup.
//!
//! Scanning l downwards from the last non-trivial leaf:
//!
//! - **clustered** (`p_l > √(x/p_b)`): consecutive leaves share the same
//!   π(x/n). The block ends where `x/p_b / p_l` reaches the next prime after
//!   `x/n`, i.e. at `l2 = π(x / p_b / p_{π(x/n)+1})`, so the whole block is
//!   added as `φ · (l − l2)` in one step.
//! - **sparse** (`p_l > z/p_b`): one lookup per leaf.
//!
//! Leaves with `p_l <= z/p_b` have `x/n >= y` and belong to the hard engine.
//!
//! When `x/p_b` fits `u64` the per-leaf quotients go through precomputed
//! [`FastDiv`] divisors; otherwise plain wide division.
//!
//! ## Checkpointing
//!
//! Workers claim b from a shared cursor inside a short critical section that
//! also records `start` (next unclaimed b) and the worker's
//! `thread{i} = {b, s2_easy}` (b just claimed, sum before b). Every
//! `checkpoint_interval` the critical section flushes the whole document. On
//! resume each worker restores its sum, recomputes its in-flight b and
//! continues from `start`, so every b is counted exactly once.

use anyhow::Result;
use rayon::prelude::*;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

use crate::checkpoint::{Document, PhaseKey, ThreadRecord};
use crate::fastdiv::FastDiv;
use crate::parallel::{build_pool, ideal_num_threads};
use crate::pi_table::PiTable;
use crate::progress::percent;
use crate::session::Session;
use crate::tables::Tables;
use crate::wide::{in_between, iroot, isqrt, min_i64, WideInt};

const PHASE: &str = "S2_easy";
const THREAD_THRESHOLD: i64 = 1000;

/// Cursor and checkpoint document shared by all workers.
struct Shared {
    next: i64,
    doc: Document,
    last_backup: Instant,
}

pub fn s2_easy<T: WideInt>(
    session: &Session,
    x: T,
    y: i64,
    z: i64,
    c: i64,
    tables: &Tables,
) -> Result<T> {
    let start_time = Instant::now();
    let key = PhaseKey::new(x, y, z);
    let mut doc = session.load_backup();
    let resumed = doc.is_resume(PHASE, &key);

    if resumed {
        if let Some(s2) = doc.get_wide::<T>(PHASE, "s2_easy") {
            info!(s2_easy = %s2, "S2_easy resumed from checkpoint");
            return Ok(s2);
        }
    } else {
        doc.erase(PHASE);
    }
    let restored = doc.clone();
    let prior_seconds = if resumed {
        doc.get_f64(PHASE, "seconds").unwrap_or(0.0)
    } else {
        0.0
    };

    let pi = &tables.pi;
    let primes = &tables.primes;
    let x13 = iroot(x, 3).to_i64();
    let pi_x13 = pi.get(x13.min(y));
    let pi_sqrty = pi.get(isqrt(y));
    let (first, stop) = session
        .partitioner()
        .assign(c.max(pi_sqrty) + 1, pi_x13);

    let start = match doc.get_i64(PHASE, "start") {
        Some(start) if resumed => start,
        _ => first,
    };
    let mut threads = ideal_num_threads(session.threads(), x13, THREAD_THRESHOLD);
    if resumed {
        if let Some(stored) = doc.get_i64(PHASE, "threads") {
            threads = threads.max(stored.max(1) as usize);
        }
        let done = doc.get_f64(PHASE, "percent").unwrap_or(0.0);
        info!(start, threads, percent = done, "S2_easy resuming");
    }
    info!(x = %x, y, c, threads, "S2_easy start");

    // fastdiv[0] is a placeholder; primes are 1-indexed
    let fastdiv: Vec<FastDiv> = primes
        .iter()
        .map(|&p| FastDiv::new(p.max(1) as u64))
        .collect();

    doc.write_key(PHASE, &key);
    let shared = Mutex::new(Shared {
        next: start,
        doc,
        last_backup: Instant::now(),
    });

    let progress = session.progress();
    progress.begin(PHASE, (stop - first + 1).max(0) as u64);
    progress.advance((start - first).max(0) as u64);
    let interval = session.config().checkpoint_interval();

    let pool = build_pool(threads)?;
    let local: T = pool.install(|| {
        (0..threads)
            .into_par_iter()
            .map(|i| {
                let mut s2 = T::ZERO;
                if let Some(rec) = restored.thread_record::<T>(PHASE, i, "s2_easy") {
                    s2 = rec.sum;
                    if rec.b >= first && rec.b <= stop {
                        s2 += easy_leaves(x, y, z, rec.b, primes, &fastdiv, pi);
                    }
                }

                loop {
                    let b = {
                        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
                        let b = guard.next;
                        guard.next += 1;
                        let next = guard.next;
                        guard.doc.set_i64(PHASE, "start", next);
                        guard
                            .doc
                            .set_thread_record(PHASE, i, "s2_easy", ThreadRecord { b, sum: s2 });

                        if guard.last_backup.elapsed() >= interval {
                            let done = percent(
                                (next - first).max(0) as u64,
                                (stop - first + 1).max(0) as u64,
                            );
                            guard.doc.set_i64(PHASE, "threads", threads as i64);
                            guard.doc.set_f64(PHASE, "percent", done);
                            let seconds = prior_seconds + start_time.elapsed().as_secs_f64();
                            guard.doc.set_f64(PHASE, "seconds", seconds);
                            session.flush_backup(&guard.doc);
                            guard.last_backup = Instant::now();
                            debug!(start = next, percent = done, "S2_easy checkpoint");
                        }
                        b
                    };

                    if b > stop {
                        break;
                    }
                    s2 += easy_leaves(x, y, z, b, primes, &fastdiv, pi);
                    progress.advance(1);
                }
                s2
            })
            .sum()
    });

    let s2 = T::from_i128(session.partitioner().reduce(local.to_i128()));

    let mut doc = shared.into_inner().unwrap_or_else(PoisonError::into_inner).doc;
    doc.erase(PHASE);
    doc.write_key(PHASE, &key);
    doc.set_wide(PHASE, "s2_easy", s2);
    doc.set_f64(PHASE, "percent", 100.0);
    doc.set_f64(PHASE, "seconds", prior_seconds + start_time.elapsed().as_secs_f64());
    session.store_backup(&doc)?;

    info!(s2_easy = %s2, seconds = start_time.elapsed().as_secs_f64(), "S2_easy done");
    Ok(s2)
}

/// Contribution of the easy leaves of one prime index b.
fn easy_leaves<T: WideInt>(
    x: T,
    y: i64,
    z: i64,
    b: i64,
    primes: &[i64],
    fastdiv: &[FastDiv],
    pi: &PiTable,
) -> T {
    let prime = primes[b as usize];
    let x2 = x / T::from_i64(prime);
    let min_trivial = min_i64(x2 / T::from_i64(prime), y);
    let min_sparse = in_between(prime, z / prime, y);
    let min_clustered = in_between(min_sparse, min_i64(isqrt(x2), y), y);

    let bounds = LeafBounds {
        b,
        l: pi.get(min_trivial),
        pi_min_clustered: pi.get(min_clustered),
        pi_min_sparse: pi.get(min_sparse),
    };

    match x2.to_u64() {
        Some(x2) => bounds.sum(pi, |l| fastdiv[l as usize].div(x2) as i64),
        None => bounds.sum(pi, |l| (x2 / T::from_i64(primes[l as usize])).to_i64()),
    }
}

struct LeafBounds {
    b: i64,
    l: i64,
    pi_min_clustered: i64,
    pi_min_sparse: i64,
}

impl LeafBounds {
    /// `quotient(l)` is `x / p_b / p_l`.
    fn sum<T: WideInt>(&self, pi: &PiTable, quotient: impl Fn(i64) -> i64) -> T {
        let b = self.b;
        let mut l = self.l;
        let mut s2 = T::ZERO;

        while l > self.pi_min_clustered {
            let xn = quotient(l);
            let phi_xn = pi.get(xn) - b + 2;
            let xm = quotient(b + phi_xn - 1);
            let l2 = pi.get(xm).max(self.pi_min_clustered);
            s2 += T::from_i64(phi_xn) * T::from_i64(l - l2);
            l = l2;
        }

        while l > self.pi_min_sparse {
            let xn = quotient(l);
            s2 += T::from_i64(pi.get(xn) - b + 2);
            l -= 1;
        }

        s2
    }
}
