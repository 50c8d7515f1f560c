//! PD controller micro-benchmark.
//!
//! Measures the per-tick cost of the velocity feedback law in isolation.

use criterion::{Criterion, criterion_group, criterion_main};

use rove_drive::control::{FeedbackController, PdController};

const DT: f64 = 0.02; // 50 Hz control period

fn bench_pd_solve(c: &mut Criterion) {
    c.bench_function("pd_solve", |b| {
        let mut con = PdController::new(0.5, 0.02);
        let mut error = 2.0;
        b.iter(|| {
            error = -error;
            con.solve(error, DT)
        });
    });
}

fn bench_pd_clone_on_attach(c: &mut Criterion) {
    c.bench_function("pd_box_clone", |b| {
        let con = PdController::new(0.5, 0.02);
        b.iter(|| con.box_clone());
    });
}

criterion_group!(benches, bench_pd_solve, bench_pd_clone_on_attach);
criterion_main!(benches);
