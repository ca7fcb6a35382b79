//! In-memory ecosystem used by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use depsweep_cache::PackageCache;
use depsweep_config::EngineConfig;
use depsweep_core::{
    DefaultScheme, Dependency, DepsweepError, Package, PackageIdentity, SourceRepository, Version,
};
use depsweep_registry::{Availability, RegistryResult, Resolver, ResolverRegistry, RetryConfig};
use depsweep_resolver::Engine;

/// A finite version universe with a backend call counter
pub struct FakeEcosystem {
    name: String,
    /// name -> version -> declared dependencies
    packages: BTreeMap<String, BTreeMap<Version, Vec<String>>>,
    failing: HashSet<String>,
    flaky: Mutex<HashMap<String, usize>>,
    unavailable: Option<String>,
    single_version: bool,
    delay: Option<Duration>,
    sources: HashMap<PathBuf, Vec<String>>,
    /// package name -> dependencies the updater adds
    updates: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
    update_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl FakeEcosystem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            packages: BTreeMap::new(),
            failing: HashSet::new(),
            flaky: Mutex::new(HashMap::new()),
            unavailable: None,
            single_version: false,
            delay: None,
            sources: HashMap::new(),
            updates: HashMap::new(),
            calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Publish `name@version` declaring `dependencies` (`"dep@spec"` strings)
    pub fn package(mut self, name: &str, version: &str, dependencies: &[&str]) -> Self {
        self.packages
            .entry(name.to_string())
            .or_default()
            .insert(
                Version::parse(version).unwrap(),
                dependencies.iter().map(|d| d.to_string()).collect(),
            );
        self
    }

    /// Every query for `name` fails with `BackendUnavailable`
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// The first `times` queries for `name` fail with `BackendUnavailable`
    pub fn flaky(self, name: &str, times: usize) -> Self {
        self.flaky.lock().unwrap().insert(name.to_string(), times);
        self
    }

    pub fn unavailable(mut self, reason: &str) -> Self {
        self.unavailable = Some(reason.to_string());
        self
    }

    pub fn single_version(mut self) -> Self {
        self.single_version = true;
        self
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }

    /// Recognize `path` as a repository declaring `dependencies`
    pub fn source(mut self, path: &str, dependencies: &[&str]) -> Self {
        self.sources
            .insert(PathBuf::from(path), dependencies.iter().map(|d| d.to_string()).collect());
        self
    }

    /// Act as an updater adding `dependencies` to every version of `name`
    pub fn updates(mut self, name: &str, dependencies: &[&str]) -> Self {
        self.updates
            .insert(name.to_string(), dependencies.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn dependency(&self, input: &str) -> Dependency {
        Dependency::parse(&format!("{}:{}", self.name, input), &DefaultScheme).unwrap()
    }

    fn build(&self, name: &str, version: &Version, dependencies: &[String]) -> Package {
        Package::new(PackageIdentity::new(&self.name, name), version.clone())
            .with_dependencies(dependencies.iter().map(|d| self.dependency(d)))
    }
}

#[async_trait]
impl Resolver for FakeEcosystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "in-memory test ecosystem"
    }

    fn allows_multiple_versions(&self) -> bool {
        !self.single_version
    }

    fn availability(&self) -> Availability {
        match &self.unavailable {
            Some(reason) => Availability::Unavailable {
                reason: reason.clone(),
            },
            None => Availability::Available,
        }
    }

    async fn resolve(&self, dependency: &Dependency) -> RegistryResult<Vec<Package>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(dependency.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let name = &dependency.identity.name;
        if self.failing.contains(name) {
            return Err(DepsweepError::backend(&self.name, format!("{} registry unreachable", name)));
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DepsweepError::backend(&self.name, "connection reset"));
                }
            }
        }

        let Some(versions) = self.packages.get(name) else {
            return Ok(Vec::new());
        };
        Ok(versions
            .iter()
            .rev()
            .filter(|(version, _)| dependency.spec.matches(version))
            .map(|(version, dependencies)| self.build(name, version, dependencies))
            .collect())
    }

    fn can_resolve_from_source(&self, repo: &SourceRepository) -> bool {
        self.sources.contains_key(&repo.path)
    }

    async fn resolve_from_source(&self, repo: &SourceRepository) -> RegistryResult<Option<Package>> {
        Ok(self.sources.get(&repo.path).map(|dependencies| {
            Package::from_source(
                PackageIdentity::new(&self.name, repo.name()),
                Version::new(0, 0, 0),
                repo.clone(),
            )
            .with_dependencies(dependencies.iter().map(|d| self.dependency(d)))
        }))
    }

    fn can_update_dependencies(&self, package: &Package) -> bool {
        self.updates.contains_key(&package.identity.name)
    }

    async fn update_dependencies(&self, package: Package) -> RegistryResult<Package> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let extra = self
            .updates
            .get(&package.identity.name)
            .map(|dependencies| dependencies.iter().map(|d| self.dependency(d)).collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(package.with_dependencies(extra))
    }
}

pub fn registry(resolvers: &[Arc<FakeEcosystem>]) -> Arc<ResolverRegistry> {
    let registry = ResolverRegistry::new();
    for resolver in resolvers {
        registry.register(Arc::clone(resolver) as Arc<dyn Resolver>).unwrap();
    }
    Arc::new(registry)
}

pub fn config() -> EngineConfig {
    EngineConfig::default().with_max_workers(4).with_max_retries(0)
}

pub fn engine(resolvers: &[Arc<FakeEcosystem>], config: EngineConfig) -> Engine {
    let max_retries = config.max_retries;
    Engine::new(registry(resolvers), Arc::new(PackageCache::in_memory()), config)
        .unwrap()
        .with_retry_config(RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryConfig::default().with_max_retries(max_retries)
        })
}

/// Sorted `name@version` labels of every node
pub fn labels(graph: &depsweep_resolver::DependencyGraph) -> Vec<String> {
    let mut labels: Vec<String> = graph
        .keys()
        .map(|key| format!("{}@{}", key.identity.name, key.version))
        .collect();
    labels.sort();
    labels
}
