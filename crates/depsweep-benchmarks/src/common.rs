//! Common utilities for benchmarks

use async_trait::async_trait;
use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use std::sync::Arc;

use depsweep_cache::PackageCache;
use depsweep_config::EngineConfig;
use depsweep_core::{Dependency, Package, PackageIdentity, Version, VersionSpec};
use depsweep_registry::{RegistryResult, Resolver, ResolverRegistry};
use depsweep_resolver::{DependencyGraph, Engine};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Layered ecosystem: every package in layer `n` depends on every package
/// in layer `n + 1`, and each package publishes `versions` versions.
pub struct Layered {
    pub layers: usize,
    pub width: usize,
    pub versions: u64,
}

impl Layered {
    pub fn new(layers: usize, width: usize, versions: u64) -> Self {
        Self { layers, width, versions }
    }

    /// Packages a full expansion produces
    pub fn package_count(&self) -> usize {
        self.layers * self.width * self.versions as usize
    }

    pub fn root(&self) -> Dependency {
        Dependency::any(PackageIdentity::new("bench", "l0p0"))
    }

    fn layer_of(name: &str) -> Option<(usize, usize)> {
        let rest = name.strip_prefix('l')?;
        let (layer, index) = rest.split_once('p')?;
        Some((layer.parse().ok()?, index.parse().ok()?))
    }
}

#[async_trait]
impl Resolver for Layered {
    fn name(&self) -> &str {
        "bench"
    }

    async fn resolve(&self, dependency: &Dependency) -> RegistryResult<Vec<Package>> {
        let Some((layer, _)) = Self::layer_of(&dependency.identity.name) else {
            return Ok(Vec::new());
        };

        let next: Vec<Dependency> = if layer + 1 < self.layers {
            (0..self.width)
                .map(|i| Dependency::any(PackageIdentity::new("bench", format!("l{}p{}", layer + 1, i))))
                .collect()
        } else {
            Vec::new()
        };

        Ok((1..=self.versions)
            .rev()
            .map(|major| Version::new(major, 0, 0))
            .filter(|version| dependency.spec.matches(version))
            .map(|version| {
                Package::new(dependency.identity.clone(), version).with_dependencies(next.iter().cloned())
            })
            .collect())
    }
}

/// A fresh engine over an in-memory cache
pub fn layered_engine(ecosystem: Layered, workers: usize) -> Engine {
    let registry = ResolverRegistry::new();
    registry.register(Arc::new(ecosystem)).unwrap();
    let config = EngineConfig::default().with_max_workers(workers).with_max_retries(0);
    Engine::new(Arc::new(registry), Arc::new(PackageCache::in_memory()), config).unwrap()
}

/// A chain of `length` packages with a back edge from the last to the first
pub fn ring_graph(length: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let keys: Vec<_> = (0..length)
        .map(|i| {
            let package = Package::new(PackageIdentity::new("bench", format!("p{}", i)), Version::new(1, 0, 0));
            let key = package.key();
            graph.add_package(package);
            key
        })
        .collect();

    for i in 0..length {
        let target = &keys[(i + 1) % length];
        let dependency = Dependency::new(target.identity.clone(), VersionSpec::any());
        let _ = graph.add_dependency(&keys[i], target, dependency);
    }
    if let Some(first) = keys.first() {
        graph.add_root(first);
    }
    graph
}
