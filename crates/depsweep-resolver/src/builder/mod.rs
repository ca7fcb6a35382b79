//! Concurrent accumulation of one resolution run
//!
//! Workers record what they learn here through idempotent inserts; nothing
//! is ever removed. Once every worker has finished, [`GraphBuilder::freeze`]
//! turns the records into a [`DependencyGraph`] in sorted order, so the
//! result does not depend on which worker finished first.

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

use depsweep_core::{Dependency, Package, PackageKey};

use crate::graph::DependencyGraph;
use crate::summary::{UnresolvedCause, UnresolvedEdge};

#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    /// Canonical package per key
    nodes: DashMap<PackageKey, Package>,
    /// Packages after dependency updaters ran
    updated: DashMap<PackageKey, Package>,
    /// Minimum depth each package was reached at
    package_depths: DashMap<PackageKey, usize>,
    /// Minimum depth each dependency was reached at
    dependency_depths: DashMap<Dependency, usize>,
    /// Packages whose dependencies were emitted
    expanded: DashSet<PackageKey>,
    resolutions: DashMap<Dependency, Vec<PackageKey>>,
    failures: DashMap<Dependency, (UnresolvedCause, String)>,
    root_dependencies: DashSet<Dependency>,
    root_packages: DashSet<PackageKey>,
    interrupted: AtomicBool,
    cycles_closed: AtomicUsize,
}

/// Lower the recorded depth for `key`; true if this caller should do the work
fn claim<K>(depths: &DashMap<K, usize>, key: K, depth: usize) -> bool
where
    K: Eq + std::hash::Hash,
{
    match depths.entry(key) {
        Entry::Occupied(mut entry) => {
            if depth < *entry.get() {
                entry.insert(depth);
                true
            } else {
                false
            }
        },
        Entry::Vacant(entry) => {
            entry.insert(depth);
            true
        },
    }
}

impl GraphBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn claim_dependency(&self, dependency: &Dependency, depth: usize) -> bool {
        claim(&self.dependency_depths, dependency.clone(), depth)
    }

    pub(crate) fn claim_package(&self, key: &PackageKey, depth: usize) -> bool {
        claim(&self.package_depths, key.clone(), depth)
    }

    /// Insert a package and return the canonical copy for its key.
    ///
    /// Builds of one version collapse into the node with the lowest build
    /// string.
    pub(crate) fn insert_package(&self, package: Package) -> Package {
        match self.nodes.entry(package.key()) {
            Entry::Occupied(mut entry) => {
                if package.version.build < entry.get().version.build {
                    entry.insert(package);
                }
                entry.get().clone()
            },
            Entry::Vacant(entry) => entry.insert(package).clone(),
        }
    }

    /// Canonical package for `key`, with updater output when present
    pub(crate) fn package(&self, key: &PackageKey) -> Option<Package> {
        if let Some(updated) = self.updated.get(key) {
            return Some(updated.clone());
        }
        self.nodes.get(key).map(|p| p.clone())
    }

    pub(crate) fn record_updated(&self, package: Package) {
        self.updated.entry(package.key()).or_insert(package);
    }

    pub(crate) fn record_resolution(&self, dependency: &Dependency, keys: Vec<PackageKey>) {
        let mut entry = self.resolutions.entry(dependency.clone()).or_default();
        for key in keys {
            if !entry.contains(&key) {
                entry.push(key);
            }
        }
    }

    pub(crate) fn record_failure(&self, dependency: &Dependency, cause: UnresolvedCause, message: impl Into<String>) {
        self.failures
            .entry(dependency.clone())
            .or_insert_with(|| (cause, message.into()));
    }

    /// Mark a dependency cancelled unless another branch already resolved it
    pub(crate) fn record_cancelled(&self, dependency: &Dependency) {
        self.interrupt();
        if !self.resolutions.contains_key(dependency) {
            self.record_failure(dependency, UnresolvedCause::Cancelled, "run cancelled");
        }
    }

    pub(crate) fn mark_expanded(&self, key: &PackageKey) {
        self.expanded.insert(key.clone());
    }

    pub(crate) fn add_root_dependency(&self, dependency: Dependency) {
        self.root_dependencies.insert(dependency);
    }

    pub(crate) fn add_root_package(&self, key: PackageKey) {
        self.root_packages.insert(key);
    }

    /// Some branches were never expanded, by cancellation or a failed task
    pub(crate) fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn close_cycle(&self) {
        self.cycles_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cycles_closed(&self) -> usize {
        self.cycles_closed.load(Ordering::Relaxed)
    }

    /// Assemble the graph. Must run after every worker has finished.
    pub(crate) fn freeze(&self, max_depth: Option<usize>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        let mut keys: Vec<PackageKey> = self.nodes.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();

        let packages: Vec<Package> = keys.iter().filter_map(|key| self.package(key)).collect();
        for package in &packages {
            graph.add_package(package.clone());
        }

        let mut roots: Vec<PackageKey> = self.root_packages.iter().map(|k| k.clone()).collect();
        for dependency in self.root_dependencies.iter() {
            if let Some(resolved) = self.resolutions.get(dependency.key()) {
                roots.extend(resolved.iter().cloned());
            }
            if let Some(failure) = self.failures.get(dependency.key()) {
                let (cause, message) = failure.value().clone();
                graph.add_unresolved(unresolved(None, dependency.key(), cause, message));
            }
        }
        roots.sort();
        for root in &roots {
            graph.add_root(root);
        }

        for package in &packages {
            let key = package.key();
            let depth = self.package_depths.get(&key).map_or(0, |d| *d);
            let truncated = max_depth.map_or(false, |max| depth >= max);

            for raw in &package.unparsed {
                graph.add_unresolved(UnresolvedEdge {
                    from: Some(key.clone()),
                    identity: raw.identity.clone(),
                    spec: raw.raw_spec.clone(),
                    cause: UnresolvedCause::InvalidSpecification,
                    message: raw.reason.clone(),
                });
            }

            if truncated {
                for dependency in &package.dependencies {
                    graph.add_unresolved(unresolved(
                        Some(key.clone()),
                        dependency,
                        UnresolvedCause::DepthExceeded,
                        format!("depth limit {} reached", depth),
                    ));
                }
                continue;
            }

            for dependency in &package.dependencies {
                let mut targets: Vec<PackageKey> = self
                    .resolutions
                    .get(dependency)
                    .map(|resolved| resolved.clone())
                    .unwrap_or_default();
                targets.extend(
                    keys.iter()
                        .filter(|candidate| dependency.identity == candidate.identity)
                        .filter(|candidate| dependency.spec.matches(&candidate.version))
                        .cloned(),
                );
                targets.sort();
                targets.dedup();

                for target in &targets {
                    if let Err(e) = graph.add_dependency(&key, target, dependency.clone()) {
                        debug!(from = %key, to = %target, error = %e, "Skipping edge to missing package");
                    }
                }

                if let Some(failure) = self.failures.get(dependency) {
                    let (cause, message) = failure.value().clone();
                    graph.add_unresolved(unresolved(Some(key.clone()), dependency, cause, message));
                } else if !self.resolutions.contains_key(dependency) || !self.expanded.contains(&key) {
                    graph.add_unresolved(unresolved(
                        Some(key.clone()),
                        dependency,
                        UnresolvedCause::Cancelled,
                        "expansion did not finish",
                    ));
                }
            }
        }

        graph.sort_unresolved();
        graph.set_cancelled(self.interrupted.load(Ordering::SeqCst));
        graph
    }
}

fn unresolved(
    from: Option<PackageKey>,
    dependency: &Dependency,
    cause: UnresolvedCause,
    message: impl Into<String>,
) -> UnresolvedEdge {
    UnresolvedEdge {
        from,
        identity: dependency.identity.clone(),
        spec: dependency.spec.to_string(),
        cause,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsweep_core::{DefaultScheme, PackageIdentity, Version};

    fn pkg(name: &str, version: &str) -> Package {
        Package::new(PackageIdentity::new("pip", name), Version::parse(version).unwrap())
    }

    fn dep(input: &str) -> Dependency {
        Dependency::parse(input, &DefaultScheme).unwrap()
    }

    #[test]
    fn test_claims_keep_minimum_depth() {
        let builder = GraphBuilder::new();
        let d = dep("pip:a@*");
        assert!(builder.claim_dependency(&d, 3));
        assert!(!builder.claim_dependency(&d, 3));
        assert!(!builder.claim_dependency(&d, 4));
        assert!(builder.claim_dependency(&d, 1));

        let key = pkg("a", "1.0.0").key();
        assert!(builder.claim_package(&key, 2));
        assert!(!builder.claim_package(&key, 2));
    }

    #[test]
    fn test_insert_keeps_lowest_build() {
        let builder = GraphBuilder::new();
        builder.insert_package(pkg("a", "1.0.0+b"));
        let canonical = builder.insert_package(pkg("a", "1.0.0+a"));
        assert_eq!(canonical.version.build.as_deref(), Some("a"));
        let again = builder.insert_package(pkg("a", "1.0.0+c"));
        assert_eq!(again.version.build.as_deref(), Some("a"));
    }

    #[test]
    fn test_cancelled_does_not_override_resolution() {
        let builder = GraphBuilder::new();
        let d = dep("pip:a@*");
        builder.record_resolution(&d, vec![pkg("a", "1.0.0").key()]);
        builder.record_cancelled(&d);
        assert!(builder.failures.is_empty());
    }

    #[test]
    fn test_freeze_links_resolved_edges() {
        let builder = GraphBuilder::new();
        let root = dep("pip:a@*");
        let child = dep("pip:b@>=1");
        let a = builder.insert_package(pkg("a", "1.0.0").with_dependency(child.clone()));
        builder.insert_package(pkg("b", "1.0.0"));
        builder.insert_package(pkg("b", "2.0.0"));

        builder.add_root_dependency(root.clone());
        builder.record_resolution(&root, vec![a.key()]);
        builder.claim_package(&a.key(), 0);
        builder.mark_expanded(&a.key());
        builder.record_resolution(&child, vec![pkg("b", "2.0.0").key(), pkg("b", "1.0.0").key()]);
        for version in ["1.0.0", "2.0.0"] {
            let key = pkg("b", version).key();
            builder.claim_package(&key, 1);
            builder.mark_expanded(&key);
        }

        let graph = builder.freeze(None);
        assert!(graph.is_complete());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.roots().len(), 1);
    }

    #[test]
    fn test_freeze_records_failures_and_truncation() {
        let builder = GraphBuilder::new();
        let root = dep("pip:a@*");
        let missing = dep("pip:gone@*");
        let a = builder.insert_package(
            pkg("a", "1.0.0")
                .with_dependency(missing.clone())
                .with_declared(PackageIdentity::new("pip", "weird"), ">>>1", &DefaultScheme),
        );
        let b = builder.insert_package(pkg("b", "1.0.0").with_dependency(dep("pip:c@*")));

        builder.add_root_dependency(root.clone());
        builder.record_resolution(&root, vec![a.key()]);
        builder.claim_package(&a.key(), 0);
        builder.mark_expanded(&a.key());
        builder.record_failure(&missing, UnresolvedCause::NoCandidates, "nothing matched");
        builder.claim_package(&b.key(), 1);

        let graph = builder.freeze(Some(1));
        let causes: Vec<UnresolvedCause> = graph.unresolved().iter().map(|e| e.cause).collect();
        assert!(causes.contains(&UnresolvedCause::NoCandidates));
        assert!(causes.contains(&UnresolvedCause::InvalidSpecification));
        assert!(causes.contains(&UnresolvedCause::DepthExceeded));
        assert!(!graph.is_complete());
        assert!(!graph.is_cancelled());
    }

    #[test]
    fn test_freeze_marks_unexpanded_as_cancelled() {
        let builder = GraphBuilder::new();
        let a = builder.insert_package(pkg("a", "1.0.0").with_dependency(dep("pip:b@*")));
        builder.add_root_package(a.key());
        builder.claim_package(&a.key(), 0);
        builder.interrupt();

        let graph = builder.freeze(None);
        assert!(graph.is_cancelled());
        assert_eq!(graph.unresolved().len(), 1);
        assert_eq!(graph.unresolved()[0].cause, UnresolvedCause::Cancelled);
    }
}
