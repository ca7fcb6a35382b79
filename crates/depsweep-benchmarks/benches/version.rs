//! Version algebra benchmarks
//!
//! Parsing versions and specs, matching, and intersection.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use depsweep_benchmarks::criterion_config;
use depsweep_core::{DefaultScheme, Version, VersionScheme};

fn create_version_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!("{}.{}.{}", i % 10, i % 7, i % 13),
            1 => format!("{}.{}.{}-rc.{}", i % 10, i % 7, i % 13, i % 3),
            2 => format!("{}.{}", i % 10, i % 7),
            _ => format!("{}.{}.{}+build{}", i % 10, i % 7, i % 13, i),
        })
        .collect()
}

fn create_spec_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 6 {
            0 => format!("^{}.{}", i % 10, i % 7),
            1 => format!("~{}.{}.{}", i % 10, i % 7, i % 13),
            2 => format!(">={}.0, <{}.0", i % 10, i % 10 + 2),
            3 => format!("~={}.{}", i % 10 + 1, i % 7),
            4 => format!("{}.{}.*", i % 10, i % 7),
            _ => format!("<{} || >={}", i % 10, i % 10 + 3),
        })
        .collect()
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let versions = create_version_strings(1000);
    let specs = create_spec_strings(1000);

    group.throughput(Throughput::Elements(versions.len() as u64));
    group.bench_function("versions", |b| {
        b.iter(|| {
            for input in &versions {
                black_box(Version::parse(input).ok());
            }
        });
    });

    group.throughput(Throughput::Elements(specs.len() as u64));
    group.bench_function("specs", |b| {
        b.iter(|| {
            for input in &specs {
                black_box(DefaultScheme.parse_spec(input).ok());
            }
        });
    });

    group.finish();
}

fn bench_algebra(c: &mut Criterion) {
    let mut group = c.benchmark_group("algebra");
    let versions: Vec<Version> = create_version_strings(500)
        .iter()
        .filter_map(|s| Version::parse(s).ok())
        .collect();
    let specs: Vec<_> = create_spec_strings(60)
        .iter()
        .filter_map(|s| DefaultScheme.parse_spec(s).ok())
        .collect();

    group.bench_function("matches", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for spec in &specs {
                hits += versions.iter().filter(|v| spec.matches(v)).count();
            }
            black_box(hits)
        });
    });

    group.bench_function("intersect", |b| {
        b.iter(|| {
            let mut satisfiable = 0usize;
            for left in &specs {
                for right in &specs {
                    if left.intersect(right).is_ok() {
                        satisfiable += 1;
                    }
                }
            }
            black_box(satisfiable)
        });
    });

    group.bench_function("sort", |b| {
        b.iter(|| {
            let mut sorted = versions.clone();
            sorted.sort();
            black_box(sorted)
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_parsing, bench_algebra
}
criterion_main!(benches);
