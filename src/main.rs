//! # Main — CLI Entry Point
//!
//! Parses the command line, builds the run [`Config`] (TOML file first, then
//! flag overrides) and hands off to [`cli`] for the actual computation.
//!
//! ## Subcommands
//!
//! - `pi <X>`: π(x) with Deléglise-Rivat (default), LMO, or one of the
//!   classical Legendre, Meissel and Lehmer formulas.
//! - `phi <X> <A>`: Legendre's partial sieve function φ(x, a).
//! - `s1`, `s2-trivial`, `s2-easy`, `s2-hard`, `s2`, `p2 <X>`: a single
//!   term of the π(x) identity at the default parameters for x.
//!
//! ## Global Options
//!
//! - `--threads`: worker threads (0 = all cores).
//! - `--alpha`: tuning factor for y = alpha · x^(1/3).
//! - `--checkpoint` / `--no-checkpoint`: resumable backup file.
//! - `--config`: TOML file with [`Config`] fields.
//! - `--status`: periodic progress lines on stderr.
//!
//! [`Config`]: primecount::config::Config

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use primecount::checkpoint::DEFAULT_BACKUP_FILE;

#[derive(Parser)]
#[command(name = "primecount", about = "Count primes below x with combinatorial algorithms")]
struct Cli {
    /// Worker threads (0 = one per logical CPU)
    #[arg(long, global = true, env = "PRIMECOUNT_THREADS")]
    threads: Option<usize>,

    /// Tuning factor for y = alpha * x^(1/3), clamped to [1, x^(1/6)]
    #[arg(long, global = true)]
    alpha: Option<f64>,

    /// Path to the checkpoint file used to resume interrupted runs
    #[arg(long, global = true, default_value = DEFAULT_BACKUP_FILE)]
    checkpoint: PathBuf,

    /// Disable checkpointing entirely
    #[arg(long, global = true)]
    no_checkpoint: bool,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long, global = true, env = "PRIMECOUNT_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress every status interval
    #[arg(long, global = true)]
    status: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count the primes <= X
    Pi {
        /// Upper bound: integer or expression such as 1e15, 10^20, 3*10^12
        x: String,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Dr)]
        algorithm: AlgorithmArg,
    },
    /// Integers <= X not divisible by any of the first A primes
    Phi {
        x: String,
        /// Number of sieving primes
        #[arg(allow_negative_numbers = true)]
        a: i64,
    },
    /// Ordinary leaves
    S1 { x: String },
    /// Special leaves with φ(x/n, b-1) = 1
    S2Trivial { x: String },
    /// Special leaves answered by a π table lookup
    S2Easy { x: String },
    /// Special leaves evaluated by the segmented sieve
    S2Hard { x: String },
    /// All special leaves
    S2 { x: String },
    /// Integers <= X with exactly two prime factors above y
    P2 { x: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Deléglise-Rivat
    Dr,
    /// Lagarias-Miller-Odlyzko
    Lmo,
    Legendre,
    Meissel,
    Lehmer,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // LOG_FORMAT=json for log collectors, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    cli::run(&cli)
}
