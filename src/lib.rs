pub mod checkpoint;
pub mod config;
pub mod counters;
pub mod deleglise_rivat;
pub mod fastdiv;
pub mod legendre;
pub mod lmo;
pub mod p2;
pub mod p3;
pub mod parallel;
pub mod phi;
pub mod phi_tiny;
pub mod pi_table;
pub mod prime_source;
pub mod progress;
pub mod s1;
pub mod s2_easy;
pub mod s2_hard;
pub mod s2_trivial;
pub mod session;
pub mod sieve;
pub mod tables;
pub mod wide;

use anyhow::{bail, Result};

use crate::deleglise_rivat::{pi_deleglise_rivat, s2};
use crate::legendre::{pi_legendre, pi_lehmer, pi_meissel};
use crate::lmo::pi_lmo;
use crate::session::{Params, Session};
use crate::tables::Tables;
use crate::wide::WideInt;

/// Largest x accepted by the `i128` path.
pub const MAX_X: i128 = 10i128.pow(31);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    DelegliseRivat,
    Lmo,
    /// `φ(x, π(√x)) + π(√x) − 1`.
    Legendre,
    Meissel,
    Lehmer,
}

impl Algorithm {
    /// The classical formulas build tables up to √x and stay on `i64`.
    fn is_classical(self) -> bool {
        matches!(self, Algorithm::Legendre | Algorithm::Meissel | Algorithm::Lehmer)
    }
}

/// One term of the π(x) identity, computed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    S1,
    S2Trivial,
    S2Easy,
    S2Hard,
    /// `S2_trivial + S2_easy + S2_hard`.
    S2,
    P2,
}

/// π(x) with the fastest algorithm.
pub fn pi(session: &Session, x: i128) -> Result<i128> {
    pi_with(session, x, Algorithm::DelegliseRivat)
}

/// π(x) on `i64` when x fits, on `i128` otherwise.
pub fn pi_with(session: &Session, x: i128, algorithm: Algorithm) -> Result<i128> {
    check_max(x)?;
    if x <= i64::MAX as i128 {
        Ok(compute_pi(session, x as i64, algorithm)?.to_i128())
    } else if algorithm.is_classical() {
        bail!("{:?} supports x <= 2^63 - 1, got {}", algorithm, x);
    } else {
        compute_pi(session, x, algorithm)
    }
}

fn compute_pi<T: WideInt>(session: &Session, x: T, algorithm: Algorithm) -> Result<T> {
    match algorithm {
        Algorithm::DelegliseRivat => pi_deleglise_rivat(session, x),
        Algorithm::Lmo => pi_lmo(session, x),
        Algorithm::Legendre => pi_legendre(session, x),
        Algorithm::Meissel => pi_meissel(session, x),
        Algorithm::Lehmer => pi_lehmer(session, x),
    }
}

/// Legendre's partial sieve function φ(x, a): the integers in `[1, x]` not
/// divisible by any of the first `a` primes.
pub fn phi(session: &Session, x: i128, a: i64) -> Result<i128> {
    check_max(x)?;
    if x <= i64::MAX as i128 {
        Ok(phi::phi(session, x as i64, a)?.to_i128())
    } else {
        phi::phi(session, x, a)
    }
}

/// A single term of the identity at the default parameters for x.
pub fn term(session: &Session, x: i128, term: Term) -> Result<i128> {
    check_max(x)?;
    if x < 8 {
        bail!("x must be >= 8 to compute a single term, got {}", x);
    }
    if x <= i64::MAX as i128 {
        Ok(compute_term(session, x as i64, term)?.to_i128())
    } else {
        compute_term(session, x, term)
    }
}

fn compute_term<T: WideInt>(session: &Session, x: T, term: Term) -> Result<T> {
    let params = Params::new(x, session.config().alpha);
    let (y, z) = (params.y, params.z);
    let tables = Tables::new(y);
    let pi_y = tables.pi_y();
    let c = params.c(pi_y);

    match term {
        Term::S1 => s1::s1(session, x, y, c, &tables),
        Term::S2Trivial => s2_trivial::s2_trivial(session, x, y, z, c, &tables),
        Term::S2Easy => s2_easy::s2_easy(session, x, y, z, c, &tables),
        Term::S2Hard => s2_hard::s2_hard(session, x, y, z, c, &tables, s2_hard::LeafSet::HardOnly),
        Term::S2 => s2(session, x, y, z, c, &tables),
        Term::P2 => p2::p2(session, x, y, z, pi_y),
    }
}

fn check_max(x: i128) -> Result<()> {
    if x > MAX_X {
        bail!("x must be <= 10^31, got {}", x);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn pi_known_values() {
        let session = Session::default();
        assert_eq!(pi(&session, -1).unwrap(), 0);
        assert_eq!(pi(&session, 100).unwrap(), 25);
        assert_eq!(pi(&session, 1_000).unwrap(), 168);
        assert_eq!(pi(&session, 10_000).unwrap(), 1229);
        assert_eq!(pi(&session, 1_000_000).unwrap(), 78498);
        assert_eq!(pi(&session, 10_000_000).unwrap(), 664579);
    }

    #[test]
    fn rejects_x_above_limit() {
        let err = pi(&Session::default(), MAX_X + 1).unwrap_err();
        assert!(err.to_string().contains("10^31"));
        assert!(term(&Session::default(), MAX_X + 1, Term::P2).is_err());
    }

    #[test]
    fn algorithms_agree() {
        let session = Session::new(Config { threads: 2, ..Config::default() });
        let others = [Algorithm::Lmo, Algorithm::Legendre, Algorithm::Meissel, Algorithm::Lehmer];
        for &x in &[54_321i128, 3_141_592, 27_182_818] {
            let expected = pi_with(&session, x, Algorithm::DelegliseRivat).unwrap();
            for algorithm in others {
                let got = pi_with(&session, x, algorithm).unwrap();
                assert_eq!(got, expected, "{:?}({})", algorithm, x);
            }
        }
    }

    #[test]
    fn classical_algorithms_reject_wide_x() {
        let x = i64::MAX as i128 + 1;
        let err = pi_with(&Session::default(), x, Algorithm::Meissel).unwrap_err();
        assert!(err.to_string().contains("2^63"));
    }

    #[test]
    fn phi_counts_unsieved_integers() {
        let session = Session::default();
        // 1 and the 19 primes in (13, 100]
        assert_eq!(phi(&session, 100, 6).unwrap(), 20);
        assert_eq!(phi(&session, 100, 10).unwrap(), 16);
        assert!(phi(&session, MAX_X + 1, 3).is_err());
    }

    #[test]
    fn terms_sum_to_pi() {
        let session = Session::default();
        let x = 20_000_000i128;
        let params = Params::new(x as i64, None);
        let pi_y = Tables::new(params.y).pi_y() as i128;

        let s1 = term(&session, x, Term::S1).unwrap();
        let trivial = term(&session, x, Term::S2Trivial).unwrap();
        let easy = term(&session, x, Term::S2Easy).unwrap();
        let hard = term(&session, x, Term::S2Hard).unwrap();
        let p2 = term(&session, x, Term::P2).unwrap();

        assert_eq!(term(&session, x, Term::S2).unwrap(), trivial + easy + hard);
        assert_eq!(s1 + trivial + easy + hard + pi_y - 1 - p2, 1_270_607);
    }

    #[test]
    fn term_rejects_tiny_x() {
        assert!(term(&Session::default(), 7, Term::S1).is_err());
    }
}
