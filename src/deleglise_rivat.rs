//! # Deléglise-Rivat — Combinatorial Prime Counting in O(x^(2/3) / log² x)
//!
//! `π(x) = S1 + S2 + π(y) − 1 − P2`, where the special leaves S2 are split
//! three ways:
//!
//! - **S2_trivial**: leaves with φ(x/n, b−1) = 1, counted in closed form.
//! - **S2_easy**: leaves answered by a single π lookup.
//! - **S2_hard**: the rest, evaluated by the segmented sieve with a
//!   counter tree ([`LeafSet::HardOnly`]).
//!
//! Each phase checkpoints independently, so an interrupted run resumes with
//! every finished phase reused from the backup document.

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::p2::p2;
use crate::prime_source::count_primes;
use crate::s1::s1;
use crate::s2_easy::s2_easy;
use crate::s2_hard::{s2_hard, LeafSet};
use crate::s2_trivial::s2_trivial;
use crate::session::{Params, Session};
use crate::tables::Tables;
use crate::wide::WideInt;

/// Below this, a direct sieve count is faster than the combinatorial setup.
pub const SMALL_X: i64 = 10_000;

pub fn pi_deleglise_rivat<T: WideInt>(session: &Session, x: T) -> Result<T> {
    if x < T::from_i64(2) {
        return Ok(T::ZERO);
    }
    if x < T::from_i64(SMALL_X) {
        return Ok(T::from_i64(count_primes(x.to_i64() as u64) as i64));
    }

    let start = Instant::now();
    let params = Params::new(x, session.config().alpha);
    let (y, z) = (params.y, params.z);
    let tables = Tables::new(y);
    let pi_y = tables.pi_y();
    let c = params.c(pi_y);
    info!(x = %x, alpha = params.alpha, y, z, c, "pi_deleglise_rivat start");

    let p2 = p2(session, x, y, z, pi_y)?;
    let s1 = s1(session, x, y, c, &tables)?;
    let s2 = s2(session, x, y, z, c, &tables)?;
    let sum = s1 + s2 + T::from_i64(pi_y) - T::ONE - p2;

    info!(pi = %sum, seconds = start.elapsed().as_secs_f64(), "pi_deleglise_rivat done");
    Ok(sum)
}

/// All special leaves: `S2_trivial + S2_easy + S2_hard`.
pub fn s2<T: WideInt>(
    session: &Session,
    x: T,
    y: i64,
    z: i64,
    c: i64,
    tables: &Tables,
) -> Result<T> {
    let trivial = s2_trivial(session, x, y, z, c, tables)?;
    let easy = s2_easy(session, x, y, z, c, tables)?;
    let hard = s2_hard(session, x, y, z, c, tables, LeafSet::HardOnly)?;
    Ok(trivial + easy + hard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{BackupStore, MemoryStore};
    use crate::config::Config;
    use std::sync::Arc;

    #[test]
    fn known_values() {
        let session = Session::default();
        let cases: [(i64, i64); 6] = [
            (100, 25),
            (1_000, 168),
            (10_000, 1229),
            (100_000, 9592),
            (1_000_000, 78498),
            (10_000_000, 664579),
        ];
        for &(x, expected) in &cases {
            assert_eq!(pi_deleglise_rivat(&session, x).unwrap(), expected, "pi({})", x);
        }
    }

    #[test]
    fn tiny_inputs() {
        let session = Session::default();
        assert_eq!(pi_deleglise_rivat(&session, -5i64).unwrap(), 0);
        assert_eq!(pi_deleglise_rivat(&session, 1i64).unwrap(), 0);
        assert_eq!(pi_deleglise_rivat(&session, 2i64).unwrap(), 1);
        assert_eq!(pi_deleglise_rivat(&session, 9_999i64).unwrap(), 1229);
    }

    #[test]
    fn matches_sieve_across_alphas() {
        for &alpha in &[1.0, 2.0, 3.5, 8.0] {
            let session = Session::new(Config { alpha: Some(alpha), threads: 2, ..Config::default() });
            for &x in &[10_007i64, 123_456, 2_000_003, 9_999_991] {
                let expected = count_primes(x as u64) as i64;
                assert_eq!(pi_deleglise_rivat(&session, x).unwrap(), expected, "pi({}) alpha {}", x, alpha);
            }
        }
    }

    #[test]
    fn wide_matches_native() {
        let session = Session::default();
        let x = 3_000_000_019i64;
        let a = pi_deleglise_rivat(&session, x).unwrap();
        let b = pi_deleglise_rivat(&session, x as i128).unwrap();
        assert_eq!(a as i128, b);
    }

    #[test]
    fn thread_count_does_not_change_result() {
        let x = 10i64.pow(9);
        let one = pi_deleglise_rivat(&Session::new(Config { threads: 1, ..Config::default() }), x).unwrap();
        let many = pi_deleglise_rivat(&Session::new(Config { threads: 5, ..Config::default() }), x).unwrap();
        assert_eq!(one, 50_847_534);
        assert_eq!(many, 50_847_534);
    }

    #[test]
    fn second_run_reuses_every_phase() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::default().with_store(store.clone());
        let first = pi_deleglise_rivat(&session, 5_000_000i64).unwrap();

        let doc = store.load();
        for phase in ["P2", "S2_trivial", "S2_hard"] {
            assert_eq!(doc.get_f64(phase, "percent"), Some(100.0), "{} finished", phase);
        }
        assert!(doc.has_phase("S2_easy"));

        let second = pi_deleglise_rivat(&session, 5_000_000i64).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 348_513);
    }
}
