//! # Config — Run Configuration
//!
//! One immutable [`Config`] value is built at startup (TOML file, then CLI
//! overrides) and handed to every phase. Nothing reads ambient global state.
//!
//! ```toml
//! threads = 8
//! alpha = 2.5
//! checkpoint_interval_secs = 60
//! status = true
//! status_interval_secs = 10
//! segments_per_thread = 4
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads; 0 = rayon default (one per logical CPU).
    pub threads: usize,
    /// Tuning factor for y = alpha · x^(1/3). `None` picks ln ln x.
    pub alpha: Option<f64>,
    /// Seconds between periodic checkpoint flushes.
    pub checkpoint_interval_secs: u64,
    /// Log progress from a background reporter thread.
    pub status: bool,
    pub status_interval_secs: u64,
    /// Segments handed to one hard-leaf worker per round.
    pub segments_per_thread: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threads: 0,
            alpha: None,
            checkpoint_interval_secs: 60,
            status: false,
            status_interval_secs: 10,
            segments_per_thread: 4,
        }
    }
}

impl Config {
    pub fn num_threads(&self) -> usize {
        if self.threads == 0 {
            rayon::current_num_threads()
        } else {
            self.threads
        }
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }
}

// ── TOML Parsing ────────────────────────────────────────────────

pub fn parse_toml(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content)
}

pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(alpha) = config.alpha {
        if !alpha.is_finite() || alpha < 1.0 {
            anyhow::bail!("alpha must be a finite number >= 1, got {}", alpha);
        }
    }
    if config.segments_per_thread < 1 {
        anyhow::bail!(
            "segments_per_thread must be >= 1, got {}",
            config.segments_per_thread
        );
    }
    Ok(())
}
