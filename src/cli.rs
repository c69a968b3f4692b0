//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim: config assembly,
//! session wiring (checkpoint store, status reporter) and subcommand
//! dispatch. Results go to stdout, logs to stderr.

use anyhow::{anyhow, bail, Context, Result};
use primecount::checkpoint::{BackupStore, FileStore, NullStore};
use primecount::config::{parse_toml_file, validate_config, Config};
use primecount::session::Session;
use primecount::{phi, pi_with, term, Algorithm, Term};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::{AlgorithmArg, Cli, Commands};

pub fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;
    let store: Arc<dyn BackupStore> = if cli.no_checkpoint {
        Arc::new(NullStore)
    } else {
        Arc::new(FileStore::new(cli.checkpoint.clone()))
    };
    let session = Session::new(config.clone()).with_store(store);

    let reporter = if config.status {
        Some(session.progress().start_reporter(config.status_interval()))
    } else {
        None
    };

    let start = Instant::now();
    let result = dispatch(&session, &cli.command);

    if let Some(handle) = reporter {
        session.progress().stop();
        if handle.join().is_err() {
            warn!("status reporter thread panicked");
        }
        session.progress().print_status();
    }

    let n = result?;
    info!(threads = session.threads(), seconds = start.elapsed().as_secs_f64(), "finished");
    println!("{}", n);
    Ok(())
}

fn dispatch(session: &Session, command: &Commands) -> Result<i128> {
    match command {
        Commands::Pi { x, algorithm } => {
            let algorithm = match algorithm {
                AlgorithmArg::Dr => Algorithm::DelegliseRivat,
                AlgorithmArg::Lmo => Algorithm::Lmo,
                AlgorithmArg::Legendre => Algorithm::Legendre,
                AlgorithmArg::Meissel => Algorithm::Meissel,
                AlgorithmArg::Lehmer => Algorithm::Lehmer,
            };
            pi_with(session, parse_x(x)?, algorithm)
        }
        Commands::Phi { x, a } => phi(session, parse_x(x)?, *a),
        Commands::S1 { x } => term(session, parse_x(x)?, Term::S1),
        Commands::S2Trivial { x } => term(session, parse_x(x)?, Term::S2Trivial),
        Commands::S2Easy { x } => term(session, parse_x(x)?, Term::S2Easy),
        Commands::S2Hard { x } => term(session, parse_x(x)?, Term::S2Hard),
        Commands::S2 { x } => term(session, parse_x(x)?, Term::S2),
        Commands::P2 { x } => term(session, parse_x(x)?, Term::P2),
    }
}

/// TOML file first, then command-line overrides.
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => parse_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if cli.alpha.is_some() {
        config.alpha = cli.alpha;
    }
    if cli.status {
        config.status = true;
    }
    validate_config(&config)?;
    Ok(config)
}

// ── Expression Parsing ──────────────────────────────────────────

/// Parse `x` from a plain integer or a product of factors, each of the form
/// `N`, `AeB` or `A^B`: `1e15`, `10^20`, `2^64`, `3*10^12`.
pub fn parse_x(input: &str) -> Result<i128> {
    let input: String = input.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    if input.is_empty() {
        bail!("empty expression");
    }
    input.split('*').try_fold(1i128, |acc, factor| {
        let value = parse_factor(factor)
            .with_context(|| format!("invalid expression '{}'", input))?;
        acc.checked_mul(value)
            .ok_or_else(|| anyhow!("'{}' overflows 128-bit integers", input))
    })
}

fn parse_factor(factor: &str) -> Result<i128> {
    if let Some((base, exp)) = factor.split_once('^') {
        return pow(parse_int(base)?, exp);
    }
    if let Some((mantissa, exp)) = factor.split_once(['e', 'E']) {
        let scale = pow(10, exp)?;
        return parse_int(mantissa)?
            .checked_mul(scale)
            .ok_or_else(|| anyhow!("'{}' overflows", factor));
    }
    parse_int(factor)
}

fn parse_int(s: &str) -> Result<i128> {
    s.parse::<i128>().map_err(|e| anyhow!("'{}': {}", s, e))
}

fn pow(base: i128, exp: &str) -> Result<i128> {
    let exp: u32 = exp.parse().map_err(|e| anyhow!("exponent '{}': {}", exp, e))?;
    base.checked_pow(exp)
        .ok_or_else(|| anyhow!("{}^{} overflows", base, exp))
}
