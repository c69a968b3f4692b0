//! # S2 Hard — Special Leaves by Segmented Sieving
//!
//! The leaves whose `φ(x/n, b−1)` cannot be read from a π table are counted
//! by sieving `[1, z]` segment by segment. Within a segment, prime index b
//! sees a sieve from which exactly the first b−1 primes have been crossed
//! off, so
//!
//! ```text
//! φ(x/n, b−1) = phi[b] + (live bits in [low, x/n])
//! ```
//!
//! where `phi[b]` carries the number of survivors below `low` from the
//! previous segments. Live-bit counts come from a [`CounterTree`] rebuilt per
//! segment and updated as multiples of each prime are crossed off.
//!
//! Two leaf shapes are handled:
//!
//! 1. `b <= π(√y)`: `n = p_b · m` for squarefree `m <= y` with
//!    `lpf(m) > p_b`, weighted by `−μ(m)`.
//! 2. `b > π(√y)`: m must be a prime `p_l`, weight `+1`.
//!    With [`LeafSet::HardOnly`] the leaves with `p_l > z/p_b` are left to
//!    the easy and trivial engines; with [`LeafSet::All`] every special leaf
//!    is counted here.
//!
//! Once a prime index has no leaf in a segment, neither it nor any larger
//! index has one in any later segment, so the segment ends there.
//!
//! ## Parallel decomposition
//!
//! The sieve domain is processed in rounds of `threads` contiguous chunks of
//! `segments_per_thread` segments. Each chunk owns its sieve, counter tree
//! and next-multiple cursors, and counts with a *local* `phi[b]` starting at
//! 0. Besides its partial sum it returns `mu_sum[b]`, the sum of the leaf
//! weights it saw for b. Chunks are folded in domain order:
//!
//! ```text
//! s2          += chunk.s2 + Σ_b phi_total[b] · chunk.mu_sum[b]
//! phi_total[b] += chunk.phi[b]
//! ```
//!
//! which restores exactly the contribution of the survivors below the chunk,
//! so the result does not depend on thread count or chunk width.
//!
//! ## Checkpointing
//!
//! After a round, if the checkpoint interval has elapsed, the next `low`,
//! the partial sum and `phi_total` are stored under the phase key (with c).

use anyhow::Result;
use rayon::prelude::*;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

use crate::checkpoint::{Document, PhaseKey};
use crate::counters::CounterTree;
use crate::parallel::{build_pool, ideal_num_threads};
use crate::progress::percent;
use crate::session::Session;
use crate::sieve::BitSieve;
use crate::tables::Tables;
use crate::wide::{ceil_div, isqrt, min_i64, next_power_of_2, WideInt};

/// Which special leaves the engine counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafSet {
    /// Only the leaves the easy and trivial engines cannot handle.
    HardOnly,
    /// Every special leaf.
    All,
}

impl LeafSet {
    pub fn phase(self) -> &'static str {
        match self {
            LeafSet::HardOnly => "S2_hard",
            LeafSet::All => "S2_lmo",
        }
    }
}

/// Whether later segments can still contain leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Not even the first prime index had a leaf.
    Exhausted,
}

/// Read-only inputs shared by all chunks.
struct HardContext<'a, T> {
    x: T,
    y: i64,
    z: i64,
    c: i64,
    pi_sqrty: i64,
    pi_end: i64,
    segment_size: i64,
    leaves: LeafSet,
    tables: &'a Tables,
}

/// Partial result of one chunk of the sieve domain.
struct HardChunk<T> {
    s2: T,
    phi: Vec<i64>,
    mu_sum: Vec<i64>,
    exhausted: bool,
}

/// Per-worker sieve state for one chunk.
struct ChunkState<T> {
    sieve: BitSieve,
    counters: CounterTree,
    next: Vec<i64>,
    phi: Vec<i64>,
    mu_sum: Vec<i64>,
    s2: T,
}

pub fn s2_hard<T: WideInt>(
    session: &Session,
    x: T,
    y: i64,
    z: i64,
    c: i64,
    tables: &Tables,
    leaves: LeafSet,
) -> Result<T> {
    let start_time = Instant::now();
    let phase = leaves.phase();
    let key = PhaseKey::new(x, y, z).with_c(c);
    let mut doc = session.load_backup();
    let resumed = doc.is_resume(phase, &key);

    if resumed {
        if let Some(s2) = doc.get_wide::<T>(phase, "s2_hard") {
            info!(phase, s2_hard = %s2, "resumed from checkpoint");
            return Ok(s2);
        }
    } else {
        doc.erase(phase);
    }

    let pi = &tables.pi;
    let limit = z + 1;
    let segment_size = next_power_of_2(isqrt(limit)).max(64);
    let pi_end = match leaves {
        LeafSet::HardOnly => pi.get(isqrt(z).min(y)),
        LeafSet::All => tables.pi_y(),
    };
    let ctx = HardContext {
        x,
        y,
        z,
        c,
        pi_sqrty: pi.get(isqrt(y)),
        pi_end,
        segment_size,
        leaves,
        tables,
    };

    let chunk_size = segment_size * session.config().segments_per_thread.max(1);
    let threads = ideal_num_threads(session.threads(), limit, chunk_size);
    info!(phase, x = %x, y, z, c, threads, segment_size, "S2 hard start");

    let mut low: i64 = 1;
    let mut s2 = T::ZERO;
    let mut phi_total = vec![0i64; pi_end.max(0) as usize + 1];
    let mut prior_seconds = 0.0;

    if resumed {
        if let Some(state) = restore(&doc, phase, phi_total.len()) {
            low = state.0;
            s2 = state.1;
            phi_total = state.2;
            prior_seconds = doc.get_f64(phase, "seconds").unwrap_or(0.0);
            info!(phase, low, percent = percent(low as u64, limit as u64), "resuming");
        }
    }

    let progress = session.progress();
    progress.begin(phase, limit as u64);
    progress.advance(low.saturating_sub(1) as u64);
    let interval = session.config().checkpoint_interval();
    let mut last_backup = Instant::now();
    let mut exhausted = c >= pi_end;

    let pool = build_pool(threads)?;
    while low < limit && !exhausted {
        let lows: Vec<i64> = (0..threads as i64)
            .map(|i| low + i * chunk_size)
            .take_while(|&l| l < limit)
            .collect();
        let chunks: Vec<HardChunk<T>> = pool.install(|| {
            lows.par_iter()
                .map(|&l| ctx.chunk(l, (l + chunk_size).min(limit)))
                .collect()
        });

        for chunk in chunks {
            let mut correction = T::ZERO;
            for (b, &mu_sum) in chunk.mu_sum.iter().enumerate() {
                if mu_sum != 0 {
                    correction += T::from_i64(phi_total[b]) * T::from_i64(mu_sum);
                }
            }
            s2 += chunk.s2 + correction;
            for (total, local) in phi_total.iter_mut().zip(&chunk.phi) {
                *total += local;
            }
            exhausted |= chunk.exhausted;
        }

        let next_low = (low + threads as i64 * chunk_size).min(limit);
        progress.advance((next_low - low) as u64);
        low = next_low;

        if last_backup.elapsed() >= interval && low < limit && !exhausted {
            let seconds = prior_seconds + start_time.elapsed().as_secs_f64();
            let done = percent(low as u64, limit as u64);
            save(&mut doc, phase, &key, threads, low, s2, &phi_total, done, seconds);
            session.flush_backup(&doc);
            last_backup = Instant::now();
            debug!(phase, low, "checkpoint");
        }
    }

    doc.erase(phase);
    doc.write_key(phase, &key);
    doc.set_wide(phase, "s2_hard", s2);
    doc.set_f64(phase, "percent", 100.0);
    doc.set_f64(phase, "seconds", prior_seconds + start_time.elapsed().as_secs_f64());
    session.store_backup(&doc)?;

    info!(phase, s2_hard = %s2, seconds = start_time.elapsed().as_secs_f64(), "S2 hard done");
    Ok(s2)
}

#[allow(clippy::too_many_arguments)]
fn save<T: WideInt>(
    doc: &mut Document,
    phase: &str,
    key: &PhaseKey,
    threads: usize,
    low: i64,
    s2: T,
    phi: &[i64],
    done: f64,
    seconds: f64,
) {
    doc.erase(phase);
    doc.write_key(phase, key);
    doc.set_i64(phase, "threads", threads as i64);
    doc.set_i64(phase, "low", low);
    doc.set_wide(phase, "s2", s2);
    doc.set_value(phase, "phi", Value::from(phi.to_vec()));
    doc.set_f64(phase, "percent", done);
    doc.set_f64(phase, "seconds", seconds);
}

/// `(low, s2, phi)` of an interrupted run, if complete and well-formed.
fn restore<T: WideInt>(doc: &Document, phase: &str, len: usize) -> Option<(i64, T, Vec<i64>)> {
    let low = doc.get_i64(phase, "low")?;
    let s2 = doc.get_wide::<T>(phase, "s2")?;
    let phi = doc
        .get_value(phase, "phi")?
        .as_array()?
        .iter()
        .map(Value::as_i64)
        .collect::<Option<Vec<i64>>>()?;
    if phi.len() != len || low < 1 {
        return None;
    }
    Some((low, s2, phi))
}

impl<T: WideInt> HardContext<'_, T> {
    /// Sieve `[low, high)` segment by segment with fresh local state.
    fn chunk(&self, low: i64, high: i64) -> HardChunk<T> {
        let primes = &self.tables.primes;
        let len = self.pi_end as usize + 1;
        let next = primes[..len]
            .iter()
            .map(|&p| {
                if p < 2 {
                    return 0;
                }
                let mut k = ceil_div(low, p) * p;
                if k % 2 == 0 {
                    k += p;
                }
                k
            })
            .collect();

        let mut state = ChunkState {
            sieve: BitSieve::new_all_clear(self.segment_size as usize),
            counters: CounterTree::new(),
            next,
            phi: vec![0; len],
            mu_sum: vec![0; len],
            s2: T::ZERO,
        };

        let mut exhausted = false;
        let mut seg_low = low;
        while seg_low < high {
            let seg_high = (seg_low + self.segment_size).min(high);
            if self.segment(&mut state, seg_low, seg_high) == Flow::Exhausted {
                exhausted = true;
                break;
            }
            seg_low = seg_high;
        }

        HardChunk {
            s2: state.s2,
            phi: state.phi,
            mu_sum: state.mu_sum,
            exhausted,
        }
    }

    /// Count the leaves whose `x/n` falls in `[low, high)`.
    fn segment(&self, st: &mut ChunkState<T>, low: i64, high: i64) -> Flow {
        let Tables { primes, pi, mu, lpf } = self.tables;
        let (x, y) = (self.x, self.y);
        let last = (high - low - 1) as usize;
        let dead = |b: i64| {
            if b == self.c + 1 {
                Flow::Exhausted
            } else {
                Flow::Continue
            }
        };

        st.sieve.pre_sieve(self.c as u64, low as u64, false);
        st.counters.init(&st.sieve);

        let mut b = self.c + 1;

        // n = p_b · m, m squarefree with lpf(m) > p_b
        while b <= self.pi_sqrty.min(self.pi_end) {
            let bi = b as usize;
            let prime = primes[bi];
            let xp = x / T::from_i64(prime);
            let min_m = min_i64(xp / T::from_i64(high), y).max(y / prime);
            let max_m = min_i64(xp / T::from_i64(low), y);

            if prime >= max_m {
                return dead(b);
            }

            for m in (min_m + 1..=max_m).rev() {
                let mi = m as usize;
                if mu[mi] != 0 && prime < lpf[mi] {
                    let xpm = (xp / T::from_i64(m)).to_i64();
                    let count = st.counters.query((xpm - low) as usize) as i64;
                    let mu_m = mu[mi] as i64;
                    st.s2 -= T::from_i64(mu_m * (st.phi[bi] + count));
                    st.mu_sum[bi] -= mu_m;
                }
            }

            st.phi[bi] += st.counters.query(last) as i64;
            st.cross_off(prime, low, high, bi);
            b += 1;
        }

        // n = p_b · p_l, p_b < p_l
        while b <= self.pi_end {
            let bi = b as usize;
            let prime = primes[bi];
            let xp = x / T::from_i64(prime);
            let mut upper = min_i64(xp / T::from_i64(low), y);
            if self.leaves == LeafSet::HardOnly {
                upper = upper.min(self.z / prime);
            }
            let mut l = pi.get(upper);

            if prime >= primes[l as usize] {
                return dead(b);
            }

            let min_m = min_i64(xp / T::from_i64(high), y).max(y / prime).max(prime);
            let min_l = pi.get(min_m);

            while l > min_l {
                let xpq = (xp / T::from_i64(primes[l as usize])).to_i64();
                let count = st.counters.query((xpq - low) as usize) as i64;
                st.s2 += T::from_i64(st.phi[bi] + count);
                st.mu_sum[bi] += 1;
                l -= 1;
            }

            st.phi[bi] += st.counters.query(last) as i64;
            st.cross_off(prime, low, high, bi);
            b += 1;
        }

        Flow::Continue
    }
}

impl<T> ChunkState<T> {
    /// Remove the odd multiples of `prime` in `[low, high)`, updating the
    /// counters for every bit that was still live.
    fn cross_off(&mut self, prime: i64, low: i64, high: i64, b: usize) {
        let mut k = self.next[b];
        while k < high {
            let i = (k - low) as usize;
            if self.sieve.test(i) {
                self.sieve.unset(i);
                self.counters.update(i);
            }
            k += prime * 2;
        }
        self.next[b] = k;
    }
}
