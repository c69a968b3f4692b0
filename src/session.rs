//! # Session — Per-Run Context Shared by All Phases
//!
//! Bundles the immutable [`Config`] with the collaborators a phase needs:
//! the checkpoint store, the range partitioner and the progress counters.
//! Also derives the algorithm parameters ([`Params`]) from x.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::checkpoint::{BackupStore, Document, NullStore};
use crate::config::Config;
use crate::parallel::{LocalPartitioner, RangePartitioner};
use crate::phi_tiny::PhiTiny;
use crate::progress::Progress;
use crate::wide::{in_between, iroot, isqrt, WideInt};

pub struct Session {
    config: Config,
    store: Arc<dyn BackupStore>,
    partitioner: Arc<dyn RangePartitioner>,
    progress: Arc<Progress>,
}

impl Session {
    /// Checkpointing off, single machine.
    pub fn new(config: Config) -> Self {
        Session {
            config,
            store: Arc::new(NullStore),
            partitioner: Arc::new(LocalPartitioner),
            progress: Progress::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_partitioner(mut self, partitioner: Arc<dyn RangePartitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.config.num_threads()
    }

    pub fn partitioner(&self) -> &dyn RangePartitioner {
        self.partitioner.as_ref()
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    pub fn load_backup(&self) -> Document {
        self.store.load()
    }

    pub fn store_backup(&self, doc: &Document) -> anyhow::Result<()> {
        self.store.store(doc)
    }

    /// Periodic flush: a failed write costs resumability, not correctness,
    /// so it is logged and the phase continues.
    pub fn flush_backup(&self, doc: &Document) {
        match self.store.store(doc) {
            Ok(()) => debug!("checkpoint flushed"),
            Err(e) => warn!(error = %e, "checkpoint flush failed"),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Config::default())
    }
}

/// Algorithm parameters derived from x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params<T> {
    pub x: T,
    pub alpha: f64,
    pub x13: i64,
    pub y: i64,
    pub z: i64,
}

impl<T: WideInt> Params<T> {
    /// `y = alpha · x^(1/3)`, clamped to `[x^(1/3), x^(1/2)]` and large
    /// enough that `z = x / y` fits `i64`.
    pub fn new(x: T, alpha: Option<f64>) -> Self {
        assert!(x >= T::from_i64(8), "x too small for parameter selection");
        let alpha = get_alpha(x, alpha);
        let x13 = iroot(x, 3).to_i64();
        let sqrtx = isqrt(x).to_i64();

        let mut y = in_between(x13, (x13 as f64 * alpha) as i64, sqrtx);
        let min_y = (x / T::from_i64(i64::MAX)).to_i64() + 1;
        y = y.max(min_y);
        let z = (x / T::from_i64(y)).to_i64();

        debug!(x = %x, alpha, y, z, "parameters");
        Params {
            x,
            alpha,
            x13,
            y,
            z,
        }
    }

    /// Number of primes sieved by [`PhiTiny`]: `min(6, π(y))`.
    pub fn c(&self, pi_y: i64) -> i64 {
        (PhiTiny::MAX_A as i64).min(pi_y)
    }
}

/// `alpha` in `[1, x^(1/6)]`; defaults to ln ln x.
pub fn get_alpha<T: WideInt>(x: T, alpha: Option<f64>) -> f64 {
    let x16 = iroot(x, 6).to_f64().max(1.0);
    let alpha = alpha.unwrap_or_else(|| x.to_f64().ln().ln());
    if alpha.is_nan() {
        return 1.0;
    }
    alpha.max(1.0).min(x16)
}

/// Wall-clock seconds since `start`, for checkpoint records.
pub fn seconds_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}
