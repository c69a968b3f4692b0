//! # Progress — Atomic Phase Progress Counters
//!
//! Thread-safe progress tracking shared between the leaf engines and the
//! background status reporter. Workers add to `processed` with relaxed
//! atomics; the phase name sits behind a Mutex (written once per phase).
//!
//! ## Background Reporter
//!
//! When status output is enabled, a dedicated thread logs the current phase,
//! percent complete and elapsed time at a fixed interval. It polls the
//! `shutdown` flag every 100 ms so `stop()` returns promptly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const POLL: Duration = Duration::from_millis(100);

pub struct Progress {
    pub processed: AtomicU64,
    pub total: AtomicU64,
    pub phase: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            processed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            phase: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Switch to a new phase of `total` work units.
    pub fn begin(&self, phase: &str, total: u64) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase.to_string();
        }
        self.total.store(total, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn advance(&self, units: u64) {
        self.processed.fetch_add(units, Ordering::Relaxed);
    }

    /// Percent complete in `[0, 100]`. An empty phase counts as done.
    pub fn percent(&self) -> f64 {
        percent(
            self.processed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }

    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || {
            let mut last = Instant::now();
            while !progress.shutdown.load(Ordering::Relaxed) {
                thread::sleep(POLL);
                if last.elapsed() >= interval {
                    progress.print_status();
                    last = Instant::now();
                }
            }
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let phase = self
            .phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        info!(
            phase = %phase,
            percent = format_args!("{:.1}", self.percent()),
            elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
            "status"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// `processed / total` as a percentage, clamped to 100.
pub fn percent(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (processed as f64 / total as f64 * 100.0).min(100.0)
}
