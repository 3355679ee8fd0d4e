//! Criterion benches for the per-block hot path of the core primitives.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use haaspan_core::biquad::{FilterChain, BUTTERWORTH_Q};
use haaspan_core::smooth::ParamSmoother;

const SR: f32 = 48_000.0;
const BLOCK: usize = 512;

fn bench_filter_chain(c: &mut Criterion) {
    let mut chain = FilterChain::new(440.0, 5000.0, BUTTERWORTH_Q, SR);
    let mut buf = vec![0.0_f32; BLOCK];
    for (n, s) in buf.iter_mut().enumerate() {
        *s = (n as f32 * 0.01).sin();
    }

    c.bench_function("filter_chain_block_512", |b| {
        b.iter(|| {
            chain.process_in_place(black_box(&mut buf));
        })
    });
}

fn bench_chain_retarget(c: &mut Criterion) {
    let mut chain = FilterChain::new(440.0, 5000.0, BUTTERWORTH_Q, SR);
    let mut hpf = ParamSmoother::new(440.0);
    let mut lpf = ParamSmoother::new(5000.0);

    // A moving cutoff defeats the coefficient cache every call, which is the
    // worst case an automation sweep produces.
    c.bench_function("chain_retarget_sweeping", |b| {
        b.iter(|| {
            let h = hpf.tick(black_box(2000.0));
            let l = lpf.tick(black_box(12_000.0));
            chain.set_cutoffs(h, l);
        })
    });
}

criterion_group!(benches, bench_filter_chain, bench_chain_retarget);
criterion_main!(benches);
