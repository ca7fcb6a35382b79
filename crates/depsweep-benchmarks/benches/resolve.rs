//! Resolution engine benchmarks
//!
//! Full expansion of a layered synthetic ecosystem with a cold cache, the
//! same resolution against a warm cache, and scaling with worker count.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use depsweep_benchmarks::{criterion_config, layered_engine, Layered};
use tokio::runtime::Runtime;

/// Benchmark cold-cache expansion for different universe sizes
fn bench_cold_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cold_resolution");
    group.sample_size(10);

    for (layers, width, versions) in [(3, 4, 2), (4, 8, 3), (5, 10, 4)] {
        let universe = Layered::new(layers, width, versions);
        group.throughput(Throughput::Elements(universe.package_count() as u64));

        group.bench_with_input(
            BenchmarkId::new("packages", universe.package_count()),
            &(layers, width, versions),
            |b, &(layers, width, versions)| {
                b.to_async(&runtime).iter(|| async move {
                    let universe = Layered::new(layers, width, versions);
                    let root = universe.root();
                    let engine = layered_engine(universe, 16);
                    black_box(engine.resolve_dependency(root).await.unwrap())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark repeated resolution answered entirely from the cache
fn bench_warm_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("warm_resolution");

    let universe = Layered::new(4, 8, 3);
    let root = universe.root();
    let engine = layered_engine(universe, 16);
    runtime.block_on(engine.resolve_dependency(root.clone())).unwrap();

    group.bench_function("layered_4x8x3", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(engine.resolve_dependency(root.clone()).await.unwrap()) });
    });

    group.finish();
}

/// Benchmark how resolution scales with the worker limit
fn bench_worker_scaling(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("worker_scaling");
    group.sample_size(10);

    for workers in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            b.to_async(&runtime).iter(|| async move {
                let universe = Layered::new(4, 8, 3);
                let root = universe.root();
                let engine = layered_engine(universe, workers);
                black_box(engine.resolve_dependency(root).await.unwrap())
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_cold_resolution, bench_warm_resolution, bench_worker_scaling
}
criterion_main!(benches);
