//! # Legendre, Meissel and Lehmer — Classical Prime Counting Formulas
//!
//! All three count the integers in `[1, x]` free of the first `a` primes with
//! [`phi`] and subtract the composites that survive:
//!
//! - **Legendre**, `a = π(√x)`: `π(x) = φ(x, a) + a − 1`.
//! - **Meissel**, `a = π(∛x)`: `π(x) = φ(x, a) + a − 1 − P2(x, a)`.
//! - **Lehmer**, `a = π(x^(1/4))`: `π(x) = φ(x, a) + a − 1 − P2(x, a) − P3(x, a)`.
//!
//! The φ and P3 tables reach √x, so these are practical well below the
//! combinatorial algorithms' range. They serve as independent checks of
//! [`pi_deleglise_rivat`](crate::deleglise_rivat::pi_deleglise_rivat).

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::p2::p2;
use crate::p3::p3;
use crate::phi::phi;
use crate::prime_source::count_primes;
use crate::session::Session;
use crate::wide::{iroot, isqrt, min_i64, WideInt};

pub fn pi_legendre<T: WideInt>(session: &Session, x: T) -> Result<T> {
    if x < T::from_i64(2) {
        return Ok(T::ZERO);
    }
    let start = Instant::now();
    let a = pi_small(isqrt(x));
    info!(x = %x, a, "pi_legendre start");

    let sum = phi(session, x, a)? + T::from_i64(a) - T::ONE;

    info!(pi = %sum, seconds = start.elapsed().as_secs_f64(), "pi_legendre done");
    Ok(sum)
}

pub fn pi_meissel<T: WideInt>(session: &Session, x: T) -> Result<T> {
    if x < T::from_i64(2) {
        return Ok(T::ZERO);
    }
    let start = Instant::now();
    let y = iroot(x, 3).to_i64();
    let a = pi_small(T::from_i64(y));
    info!(x = %x, y, a, "pi_meissel start");

    let p2 = p2(session, x, y, min_i64(x / T::from_i64(y), i64::MAX), a)?;
    let sum = phi(session, x, a)? + T::from_i64(a) - T::ONE - p2;

    info!(pi = %sum, seconds = start.elapsed().as_secs_f64(), "pi_meissel done");
    Ok(sum)
}

pub fn pi_lehmer<T: WideInt>(session: &Session, x: T) -> Result<T> {
    if x < T::from_i64(2) {
        return Ok(T::ZERO);
    }
    let start = Instant::now();
    let y = iroot(x, 4).to_i64();
    let a = pi_small(T::from_i64(y));
    info!(x = %x, y, a, "pi_lehmer start");

    let p2 = p2(session, x, y, min_i64(x / T::from_i64(y), i64::MAX), a)?;
    let p3 = p3(session, x, a)?;
    let sum = phi(session, x, a)? + T::from_i64(a) - T::ONE - p2 - p3;

    info!(pi = %sum, seconds = start.elapsed().as_secs_f64(), "pi_lehmer done");
    Ok(sum)
}

fn pi_small<T: WideInt>(n: T) -> i64 {
    count_primes(n.to_i64() as u64) as i64
}
