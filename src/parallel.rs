//! # Parallel — Thread Scaling, Pools and Range Partitioning
//!
//! Every phase runs in its own rayon pool sized by [`ideal_num_threads`]:
//! small workloads get fewer threads so pool overhead does not dominate.
//!
//! [`RangePartitioner`] is the seam for splitting a prime-index range across
//! machines. The leaf engines call `assign` on their full range and `reduce`
//! on their partial sum; [`LocalPartitioner`] is the identity.

use anyhow::Result;
use std::sync::atomic::{AtomicI64, Ordering};

/// Scale `threads` down so each thread gets at least `threshold` units of
/// `work`. Never returns 0.
pub fn ideal_num_threads(threads: usize, work: i64, threshold: i64) -> usize {
    let threshold = threshold.max(1);
    let by_work = (work / threshold).max(1) as usize;
    threads.min(by_work).max(1)
}

pub fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("primecount-{}", i))
        .build()?;
    Ok(pool)
}

/// Shared, monotonically increasing work cursor over `[start, stop]`.
#[derive(Debug)]
pub struct WorkCursor {
    next: AtomicI64,
    stop: i64,
}

impl WorkCursor {
    pub fn new(start: i64, stop: i64) -> Self {
        WorkCursor {
            next: AtomicI64::new(start),
            stop,
        }
    }

    /// Claim the next `len` indices. Returns `None` once the range is exhausted.
    pub fn claim(&self, len: i64) -> Option<(i64, i64)> {
        let len = len.max(1);
        let start = self.next.fetch_add(len, Ordering::Relaxed);
        if start > self.stop {
            return None;
        }
        Some((start, (start + len - 1).min(self.stop)))
    }
}

/// Splits a phase's index range across cooperating processes and combines
/// their partial results. The engines do not know whether their subrange
/// came from local threads or a remote coordinator.
pub trait RangePartitioner: Send + Sync {
    /// The part of `[start, stop]` this process should compute.
    fn assign(&self, start: i64, stop: i64) -> (i64, i64);
    /// Combine this process's partial sum with everyone else's.
    fn reduce(&self, partial: i128) -> i128;
}

/// Single-machine run: compute everything, nothing to combine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPartitioner;

impl RangePartitioner for LocalPartitioner {
    fn assign(&self, start: i64, stop: i64) -> (i64, i64) {
        (start, stop)
    }

    fn reduce(&self, partial: i128) -> i128 {
        partial
    }
}

/// Computes only the lower or the upper half of every assigned range, so
/// two sessions together cover what one local session does.
#[cfg(test)]
pub(crate) struct HalfPartitioner {
    pub upper: bool,
}

#[cfg(test)]
impl RangePartitioner for HalfPartitioner {
    fn assign(&self, start: i64, stop: i64) -> (i64, i64) {
        let mid = start + (stop - start) / 2;
        if self.upper {
            (mid + 1, stop)
        } else {
            (start, mid)
        }
    }

    fn reduce(&self, partial: i128) -> i128 {
        partial
    }
}
