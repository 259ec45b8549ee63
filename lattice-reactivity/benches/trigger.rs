//! Trigger fan-out benchmarks.
//!
//! Measures the cost of one write as the number of effects subscribed to the
//! written key grows, and the cost of a computed chain invalidation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lattice_reactivity::{create_effect, Computed, EffectOptions, ReactiveObject};

fn bench_effect_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_fan_out");

    for subscribers in [1usize, 10, 100, 1000] {
        let obj = ReactiveObject::new();
        obj.set("x", 0);

        let effects: Vec<_> = (0..subscribers)
            .map(|_| {
                let obj = obj.clone();
                create_effect(
                    move || {
                        black_box(obj.get("x"));
                    },
                    EffectOptions::default(),
                )
            })
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                let mut n = 0;
                b.iter(|| {
                    n += 1;
                    obj.set("x", n);
                });
            },
        );

        drop(effects);
    }

    group.finish();
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [1usize, 10, 100] {
        let obj = ReactiveObject::new();
        obj.set("x", 0);

        let mut chain = Vec::with_capacity(depth);
        let base = {
            let obj = obj.clone();
            Computed::new(move || obj.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0))
        };
        chain.push(base);
        for _ in 1..depth {
            let prev = chain[chain.len() - 1].clone();
            chain.push(Computed::new(move || prev.get() + 1.0));
        }
        let last = chain[chain.len() - 1].clone();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut n = 0;
            b.iter(|| {
                n += 1;
                obj.set("x", n);
                black_box(last.get())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_effect_fan_out, bench_computed_chain);
criterion_main!(benches);
