//! Superset resolution engine
//!
//! The engine expands root dependencies into every package version any
//! valid resolution could select. Work is split into two kinds of task:
//! resolving a dependency into its candidate packages, and expanding a
//! package into its dependencies. A coordinator spawns tasks on a
//! [`JoinSet`] and collects the follow-up work each returns.
//!
//! Each dependency and package is claimed once per run at the smallest depth
//! it is reached at, which bounds the work even when the dependency graph is
//! cyclic. External calls go through the [`PackageCache`] so concurrent
//! branches asking the same question share one resolver call, and a
//! semaphore bounds how many resolver calls run at once.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use depsweep_cache::{CacheKey, CacheValue, JsonFileStore, MemoryStore, PackageCache};
use depsweep_config::{CacheConfig, EngineConfig};
use depsweep_core::{Dependency, DepsweepError, Package, SourceRepository};
use depsweep_registry::{with_retry, Availability, Resolver, ResolverRegistry, RetryConfig};

use crate::builder::GraphBuilder;
use crate::graph::{DependencyGraph, RequirementConflict};
use crate::partial::PartialResolution;
use crate::summary::UnresolvedCause;
use crate::ResolverResult;

/// Where a resolution starts
#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    /// An explicit package spec such as `pip:flask@>=2`
    Dependency(Dependency),
    /// A package whose declared dependencies are expanded
    Package(Package),
    /// A local repository handed to every resolver that recognizes it
    Source(SourceRepository),
}

impl From<Dependency> for Root {
    fn from(dependency: Dependency) -> Self {
        Root::Dependency(dependency)
    }
}

impl From<Package> for Root {
    fn from(package: Package) -> Self {
        Root::Package(package)
    }
}

impl From<SourceRepository> for Root {
    fn from(repository: SourceRepository) -> Self {
        Root::Source(repository)
    }
}

/// Stops an engine from spawning new work.
///
/// Cancellation is sticky: the current run and every later run on the same
/// engine return at once with their unexpanded edges marked cancelled.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        info!("Cancelling resolution");
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

pub struct Engine {
    registry: Arc<ResolverRegistry>,
    cache: Arc<PackageCache>,
    config: EngineConfig,
    retry: RetryConfig,
    cancel: Arc<watch::Sender<bool>>,
}

impl Engine {
    /// Create an engine over an existing cache.
    ///
    /// Fails if the configuration is invalid, or if `clear_cache` is set
    /// and the cache cannot be cleared.
    pub fn new(registry: Arc<ResolverRegistry>, cache: Arc<PackageCache>, config: EngineConfig) -> ResolverResult<Self> {
        config.validate()?;
        if config.clear_cache {
            info!("Clearing package cache before resolving");
            cache.clear()?;
        }

        let (sender, _) = watch::channel(false);
        Ok(Self {
            registry,
            cache,
            retry: RetryConfig::default().with_max_retries(config.max_retries),
            config,
            cancel: Arc::new(sender),
        })
    }

    /// Create an engine with the cache backend named in the configuration
    pub fn from_config(registry: Arc<ResolverRegistry>, config: EngineConfig) -> ResolverResult<Self> {
        let cache = match &config.cache {
            CacheConfig::Memory => PackageCache::new(Arc::new(MemoryStore::new())),
            CacheConfig::File { path } => PackageCache::new(Arc::new(JsonFileStore::load_or_create(path)?)),
        };
        Self::new(registry, Arc::new(cache), config)
    }

    /// Replace the backoff policy for resolver calls
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &Arc<ResolverRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<PackageCache> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            sender: Arc::clone(&self.cancel),
        }
    }

    /// Parse `ecosystem:name@spec` with the grammar of the ecosystem's resolver
    pub fn parse_dependency(&self, input: &str) -> ResolverResult<Dependency> {
        let ecosystem = input.split(':').next().unwrap_or_default();
        let resolver = self.registry.resolver_by_name(ecosystem)?;
        Dependency::parse(input, resolver.scheme())
    }

    pub async fn resolve_dependency(&self, dependency: Dependency) -> ResolverResult<DependencyGraph> {
        self.resolve(vec![Root::Dependency(dependency)]).await
    }

    pub async fn resolve_source(&self, repository: SourceRepository) -> ResolverResult<DependencyGraph> {
        self.resolve(vec![Root::Source(repository)]).await
    }

    /// Expand `roots` into the superset dependency graph.
    ///
    /// Only root-level problems are errors: an ecosystem with no resolver or
    /// a source repository nobody can read. Everything below the roots that
    /// fails is recorded in the graph as an unresolved edge.
    pub async fn resolve(&self, roots: Vec<Root>) -> ResolverResult<DependencyGraph> {
        info!(roots = roots.len(), max_depth = ?self.config.max_depth, workers = self.config.max_workers, "Starting resolution");

        let run = Arc::new(Run {
            registry: Arc::clone(&self.registry),
            cache: Arc::clone(&self.cache),
            permits: Arc::new(Semaphore::new(self.config.max_workers)),
            builder: GraphBuilder::new(),
            max_depth: self.config.max_depth,
            retry: self.retry.clone(),
            cancel: self.cancel.subscribe(),
            availability: DashMap::new(),
        });

        let mut pending = VecDeque::new();
        for root in roots {
            match root {
                Root::Dependency(dependency) => {
                    self.registry.resolver_by_name(&dependency.identity.ecosystem)?;
                    run.builder.add_root_dependency(dependency.clone());
                    pending.push_back(Work::Dependency {
                        path: PartialResolution::new().push(dependency.clone()),
                        dependency,
                        depth: 0,
                    });
                },
                Root::Package(package) => {
                    pending.push_back(run.root_package(package));
                },
                Root::Source(repository) => {
                    for package in self.source_packages(&repository).await? {
                        pending.push_back(run.root_package(package));
                    }
                },
            }
        }

        let mut tasks = JoinSet::new();
        loop {
            while let Some(work) = pending.pop_front() {
                if run.is_cancelled() {
                    run.abandon(work);
                    continue;
                }
                let run = Arc::clone(&run);
                tasks.spawn(async move { run.process(work).await });
            }

            match tasks.join_next().await {
                Some(Ok(follow_ups)) => pending.extend(follow_ups),
                Some(Err(e)) => {
                    warn!(error = %e, "Resolution task failed");
                    run.builder.interrupt();
                },
                None => break,
            }
        }

        let graph = run.builder.freeze(self.config.max_depth);
        if let Err(e) = self.cache.flush() {
            warn!(error = %e, "Failed to flush package cache");
        }

        let summary = graph.summary();
        debug!(cycles_closed = run.builder.cycles_closed(), cache = ?self.cache.stats(), "Resolution finished");
        if summary.complete {
            info!("Resolved {}", summary);
        } else {
            warn!("Resolved {}", summary);
        }
        Ok(graph)
    }

    /// Requirement conflicts among ecosystems that install one version per package
    pub fn requirement_conflicts(&self, graph: &DependencyGraph) -> Vec<RequirementConflict> {
        graph.requirement_conflicts(|ecosystem| {
            self.registry
                .get(ecosystem)
                .map_or(false, |resolver| !resolver.allows_multiple_versions())
        })
    }

    /// Ask every resolver that recognizes the repository for its source package
    async fn source_packages(&self, repository: &SourceRepository) -> ResolverResult<Vec<Package>> {
        let mut packages = Vec::new();
        for resolver in self.registry.source_resolvers(repository) {
            match with_retry(&self.retry, || resolver.resolve_from_source(repository)).await {
                Ok(Some(package)) => {
                    debug!(resolver = resolver.name(), package = %package, "Resolved source package");
                    packages.push(package);
                },
                Ok(None) => debug!(resolver = resolver.name(), repository = %repository, "Resolver produced no source package"),
                Err(e) => warn!(resolver = resolver.name(), repository = %repository, error = %e, "Source resolution failed"),
            }
        }

        if packages.is_empty() {
            return Err(DepsweepError::NoSourceResolver {
                path: repository.to_string(),
            });
        }
        Ok(packages)
    }
}

enum Work {
    /// Resolve a dependency into candidate packages
    Dependency {
        dependency: Dependency,
        depth: usize,
        path: PartialResolution,
    },
    /// Expand a package into its dependencies
    Package {
        package: Package,
        depth: usize,
        path: PartialResolution,
    },
}

/// State shared by the tasks of one `Engine::resolve` call
struct Run {
    registry: Arc<ResolverRegistry>,
    cache: Arc<PackageCache>,
    permits: Arc<Semaphore>,
    builder: GraphBuilder,
    max_depth: Option<usize>,
    retry: RetryConfig,
    cancel: watch::Receiver<bool>,
    /// Backend checks, once per resolver per run
    availability: DashMap<String, Availability>,
}

impl Run {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn root_package(&self, package: Package) -> Work {
        let package = self.builder.insert_package(package);
        self.builder.add_root_package(package.key());
        Work::Package {
            package,
            depth: 0,
            path: PartialResolution::new(),
        }
    }

    /// Record work that will not run because the run was cancelled
    fn abandon(&self, work: Work) {
        match work {
            Work::Dependency { dependency, .. } => self.builder.record_cancelled(&dependency),
            Work::Package { .. } => self.builder.interrupt(),
        }
    }

    /// Wait for a worker slot; fails once the run is cancelled
    async fn permit(&self) -> ResolverResult<OwnedSemaphorePermit> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DepsweepError::Cancelled)?;
        if self.is_cancelled() {
            return Err(DepsweepError::Cancelled);
        }
        Ok(permit)
    }

    fn availability(&self, resolver: &Arc<dyn Resolver>) -> Availability {
        self.availability
            .entry(resolver.name().to_string())
            .or_insert_with(|| {
                let availability = resolver.availability();
                if let Availability::Unavailable { reason } = &availability {
                    warn!(resolver = resolver.name(), reason = %reason, "Resolver backend unavailable");
                }
                availability
            })
            .clone()
    }

    async fn process(self: Arc<Self>, work: Work) -> Vec<Work> {
        match work {
            Work::Dependency {
                dependency,
                depth,
                path,
            } => self.resolve_dependency(dependency, depth, path).await,
            Work::Package { package, depth, path } => self.expand_package(package, depth, path).await,
        }
    }

    async fn resolve_dependency(self: &Arc<Self>, dependency: Dependency, depth: usize, path: PartialResolution) -> Vec<Work> {
        if !self.builder.claim_dependency(&dependency, depth) {
            return Vec::new();
        }
        if self.is_cancelled() {
            self.builder.record_cancelled(&dependency);
            return Vec::new();
        }

        let Some(resolver) = self.registry.get(&dependency.identity.ecosystem) else {
            debug!(dependency = %dependency, "No resolver for ecosystem");
            self.builder.record_failure(
                &dependency,
                UnresolvedCause::NoResolver,
                format!("no resolver for ecosystem '{}'", dependency.identity.ecosystem),
            );
            return Vec::new();
        };

        if let Availability::Unavailable { reason } = self.availability(&resolver) {
            self.builder
                .record_failure(&dependency, UnresolvedCause::BackendUnavailable, reason);
            return Vec::new();
        }

        let key = CacheKey::candidates(dependency.identity.clone(), dependency.spec.clone());
        let compute = {
            let run = Arc::clone(self);
            let dependency = dependency.clone();
            move || async move {
                let _permit = run.permit().await?;
                debug!(dependency = %dependency, resolver = resolver.name(), "Querying resolver");
                let candidates = with_retry(&run.retry, || resolver.resolve(&dependency)).await?;
                Ok::<_, DepsweepError>(CacheValue::Candidates(candidates))
            }
        };

        let candidates = match self.cache.get_or_compute(key, compute).await {
            Ok(value) => value.into_candidates().unwrap_or_default(),
            Err(e) => {
                match UnresolvedCause::from_error(&e) {
                    UnresolvedCause::Cancelled => self.builder.record_cancelled(&dependency),
                    cause => {
                        warn!(dependency = %dependency, error = %e, "Dependency unresolved");
                        self.builder.record_failure(&dependency, cause, e.to_string());
                    },
                }
                return Vec::new();
            },
        };

        if candidates.is_empty() {
            debug!(dependency = %dependency, "No candidates");
            self.builder.record_failure(
                &dependency,
                UnresolvedCause::NoCandidates,
                format!("no version of {} matches '{}'", dependency.identity, dependency.spec),
            );
            return Vec::new();
        }

        let candidates: Vec<Package> = candidates
            .into_iter()
            .map(|candidate| self.builder.insert_package(candidate))
            .collect();
        self.builder
            .record_resolution(&dependency, candidates.iter().map(Package::key).collect());
        debug!(dependency = %dependency, candidates = candidates.len(), depth, "Resolved dependency");

        candidates
            .into_iter()
            .map(|package| Work::Package {
                package,
                depth,
                path: path.clone(),
            })
            .collect()
    }

    async fn expand_package(self: &Arc<Self>, package: Package, depth: usize, path: PartialResolution) -> Vec<Work> {
        let key = package.key();
        if !self.builder.claim_package(&key, depth) {
            return Vec::new();
        }
        if self.is_cancelled() {
            self.builder.interrupt();
            return Vec::new();
        }

        let package = self.apply_updaters(package).await;

        if self.max_depth.map_or(false, |max| depth >= max) {
            debug!(package = %key, depth, "Depth limit reached, not expanding");
            return Vec::new();
        }

        self.builder.mark_expanded(&key);
        let mut follow_ups = Vec::with_capacity(package.dependencies.len());
        for dependency in package.dependencies {
            if path.closes_cycle(&dependency) {
                debug!(package = %key, dependency = %dependency, "Cycle closed");
                self.builder.close_cycle();
                continue;
            }
            if let Some(active) = path.overlapping(&dependency) {
                debug!(dependency = %dependency, active = %active, "Overlapping spec already on path");
            }
            follow_ups.push(Work::Dependency {
                path: path.push(dependency.clone()),
                dependency,
                depth: depth + 1,
            });
        }
        follow_ups
    }

    /// Run every applicable dependency updater once per package
    async fn apply_updaters(self: &Arc<Self>, package: Package) -> Package {
        let updaters = self.registry.updaters_for(&package);
        if updaters.is_empty() {
            return package;
        }

        let key = package.key();
        let compute = {
            let run = Arc::clone(self);
            let original = package.clone();
            move || async move {
                let mut current = original;
                for updater in updaters {
                    let _permit = run.permit().await?;
                    let result = with_retry(&run.retry, || updater.update_dependencies(current.clone())).await;
                    match result {
                        Ok(updated) if updated.key() == current.key() => current = updated,
                        Ok(updated) => {
                            warn!(updater = updater.name(), package = %current, returned = %updated, "Updater changed the package identity, ignoring");
                        },
                        Err(e) => {
                            warn!(updater = updater.name(), package = %current, error = %e, "Dependency updater failed");
                        },
                    }
                }
                Ok::<_, DepsweepError>(CacheValue::Updated(current))
            }
        };

        match self.cache.get_or_compute(CacheKey::updated(key.clone()), compute).await {
            Ok(value) => match value.into_updated() {
                Some(updated) => {
                    self.builder.record_updated(updated.clone());
                    updated
                },
                None => package,
            },
            Err(e) => {
                debug!(package = %key, error = %e, "Keeping declared dependencies");
                package
            },
        }
    }
}
