use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primecount::config::Config;
use primecount::fastdiv::FastDiv;
use primecount::phi_tiny::phi_tiny;
use primecount::session::Session;
use primecount::{pi_with, term, Algorithm, Term};

fn bench_fastdiv(c: &mut Criterion) {
    let d = FastDiv::new(1_000_003);
    c.bench_function("FastDiv::div x1000", |b| {
        b.iter(|| {
            (0..1000u64)
                .map(|i| d.div(black_box(u64::MAX - i * 7919)))
                .fold(0u64, u64::wrapping_add)
        });
    });
}

fn bench_phi_tiny(c: &mut Criterion) {
    c.bench_function("phi_tiny(10^18, 6)", |b| {
        b.iter(|| phi_tiny(black_box(1_000_000_000_000_000_000i64), black_box(6)));
    });
}

fn bench_pi_deleglise_rivat(c: &mut Criterion) {
    let session = Session::new(Config { threads: 1, ..Config::default() });
    c.bench_function("pi_deleglise_rivat(10^10)", |b| {
        b.iter(|| pi_with(&session, black_box(10_000_000_000), Algorithm::DelegliseRivat));
    });
}

fn bench_pi_lmo(c: &mut Criterion) {
    let session = Session::new(Config { threads: 1, ..Config::default() });
    c.bench_function("pi_lmo(10^10)", |b| {
        b.iter(|| pi_with(&session, black_box(10_000_000_000), Algorithm::Lmo));
    });
}

fn bench_s2_easy(c: &mut Criterion) {
    let session = Session::new(Config { threads: 1, ..Config::default() });
    c.bench_function("S2_easy(10^11)", |b| {
        b.iter(|| term(&session, black_box(100_000_000_000), Term::S2Easy));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_fastdiv, bench_phi_tiny, bench_pi_deleglise_rivat, bench_pi_lmo, bench_s2_easy
}
criterion_main!(benches);
