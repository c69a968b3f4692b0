//! # LMO — Lagarias-Miller-Odlyzko Prime Counting
//!
//! Same identity as Deléglise-Rivat, but every special leaf goes through the
//! segmented sieve ([`LeafSet::All`]). Slower by a log factor; kept as an
//! independent cross-check of the trivial/easy/hard split.

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::deleglise_rivat::SMALL_X;
use crate::p2::p2;
use crate::prime_source::count_primes;
use crate::s1::s1;
use crate::s2_hard::{s2_hard, LeafSet};
use crate::session::{Params, Session};
use crate::tables::Tables;
use crate::wide::WideInt;

pub fn pi_lmo<T: WideInt>(session: &Session, x: T) -> Result<T> {
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
    info!(x = %x, alpha = params.alpha, y, z, c, "pi_lmo start");

    let p2 = p2(session, x, y, z, pi_y)?;
    let s1 = s1(session, x, y, c, &tables)?;
    let s2 = s2_hard(session, x, y, z, c, &tables, LeafSet::All)?;
    let sum = s1 + s2 + T::from_i64(pi_y) - T::ONE - p2;

    info!(pi = %sum, seconds = start.elapsed().as_secs_f64(), "pi_lmo done");
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::deleglise_rivat::pi_deleglise_rivat;

    #[test]
    fn known_values() {
        let session = Session::default();
        assert_eq!(pi_lmo(&session, 0i64).unwrap(), 0);
        assert_eq!(pi_lmo(&session, 1_000i64).unwrap(), 168);
        assert_eq!(pi_lmo(&session, 1_000_000i64).unwrap(), 78498);
        assert_eq!(pi_lmo(&session, 10_000_000i64).unwrap(), 664579);
    }

    #[test]
    fn agrees_with_deleglise_rivat() {
        let session = Session::new(Config { threads: 3, ..Config::default() });
        for &x in &[10_001i64, 777_777, 12_345_678, 200_000_033] {
            assert_eq!(
                pi_lmo(&session, x).unwrap(),
                pi_deleglise_rivat(&session, x).unwrap(),
                "x = {}",
                x
            );
        }
    }

    #[test]
    fn wide_path() {
        let session = Session::new(Config { alpha: Some(2.0), ..Config::default() });
        assert_eq!(pi_lmo(&session, 100_000_000i128).unwrap(), 5_761_455);
    }
}
