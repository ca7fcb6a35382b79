//! Dependency graph implementation using petgraph
//!
//! Nodes are resolved packages keyed by (ecosystem, name, version); edges
//! carry the dependency (identity and spec) that produced them. The graph
//! may contain cycles, and every traversal tracks visited nodes.

mod analysis;
mod export;

pub use analysis::RequirementConflict;
pub use export::{
    ExchangeEdge, ExchangeNode, GraphExchange, SbomComponent, SbomDocument, SbomRelationship,
};

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Dfs, EdgeRef};
use petgraph::Direction;
use std::collections::BTreeMap;

use depsweep_core::{Dependency, Package, PackageIdentity, PackageKey, Version, Vulnerability};

use crate::summary::{ResolutionSummary, UnresolvedCause, UnresolvedEdge};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Underlying directed graph
    graph: DiGraph<Package, Dependency>,
    /// Map from package key to node index for fast lookups
    node_map: IndexMap<PackageKey, NodeIndex>,
    roots: Vec<NodeIndex>,
    unresolved: Vec<UnresolvedEdge>,
    vulnerabilities: BTreeMap<PackageKey, Vec<Vulnerability>>,
    cancelled: bool,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package node; adding a present package is a no-op.
    ///
    /// Versions differing only in build metadata share a node. The variant
    /// with the lowest build string is kept.
    pub fn add_package(&mut self, package: Package) -> NodeIndex {
        let key = package.key();
        if let Some(&index) = self.node_map.get(&key) {
            if let Some(existing) = self.graph.node_weight_mut(index) {
                if package.version.build < existing.version.build {
                    *existing = package;
                }
            }
            return index;
        }

        let index = self.graph.add_node(package);
        self.node_map.insert(key, index);
        index
    }

    /// Add a depends-on edge between two present packages.
    ///
    /// Adding the same edge twice is a no-op.
    pub fn add_dependency(&mut self, from: &PackageKey, to: &PackageKey, dependency: Dependency) -> Result<(), String> {
        let from_index = *self
            .node_map
            .get(from)
            .ok_or_else(|| format!("Package not found: {}", from))?;
        let to_index = *self
            .node_map
            .get(to)
            .ok_or_else(|| format!("Package not found: {}", to))?;

        let exists = self
            .graph
            .edges_connecting(from_index, to_index)
            .any(|edge| *edge.weight() == dependency);
        if !exists {
            self.graph.add_edge(from_index, to_index, dependency);
        }
        Ok(())
    }

    /// Mark a present package as a root of the resolution
    pub fn add_root(&mut self, key: &PackageKey) -> bool {
        match self.node_map.get(key) {
            Some(&index) => {
                if !self.roots.contains(&index) {
                    self.roots.push(index);
                }
                true
            },
            None => false,
        }
    }

    pub fn add_unresolved(&mut self, edge: UnresolvedEdge) {
        if !self.unresolved.contains(&edge) {
            self.unresolved.push(edge);
        }
    }

    pub(crate) fn sort_unresolved(&mut self) {
        self.unresolved.sort();
    }

    pub(crate) fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    /// Get package by key
    pub fn node(&self, key: &PackageKey) -> Option<&Package> {
        let index = self.node_map.get(key)?;
        self.graph.node_weight(*index)
    }

    pub fn contains(&self, key: &PackageKey) -> bool {
        self.node_map.contains_key(key)
    }

    /// All packages, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Package> {
        self.node_map.values().filter_map(|index| self.graph.node_weight(*index))
    }

    pub fn keys(&self) -> impl Iterator<Item = &PackageKey> {
        self.node_map.keys()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every edge as (requirer, dependency, resolved target), sorted
    pub fn edges(&self) -> Vec<(&Package, &Dependency, &Package)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let from = self.graph.node_weight(edge.source())?;
                let to = self.graph.node_weight(edge.target())?;
                Some((from, edge.weight(), to))
            })
            .collect();
        edges.sort_by(|a, b| (a.0.key(), a.2.key()).cmp(&(b.0.key(), b.2.key())));
        edges
    }

    /// Outgoing edges of a package, sorted by target
    pub fn edges_from(&self, key: &PackageKey) -> Vec<(&Dependency, &Package)> {
        let Some(&index) = self.node_map.get(key) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges(index)
            .filter_map(|edge| Some((edge.weight(), self.graph.node_weight(edge.target())?)))
            .collect();
        edges.sort_by_key(|(_, target)| target.key());
        edges
    }

    /// Packages that depend on `key`, sorted
    pub fn dependents_of(&self, key: &PackageKey) -> Vec<&Package> {
        let Some(&index) = self.node_map.get(key) else {
            return Vec::new();
        };
        let mut dependents: Vec<_> = self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n))
            .collect();
        dependents.sort_by_key(|p| p.key());
        dependents.dedup_by_key(|p| p.key());
        dependents
    }

    pub fn roots(&self) -> Vec<&Package> {
        self.roots
            .iter()
            .filter_map(|index| self.graph.node_weight(*index))
            .collect()
    }

    /// Every resolved version of an identity, ascending
    pub fn versions_of(&self, identity: &PackageIdentity) -> Vec<&Version> {
        let mut versions: Vec<_> = self
            .node_map
            .keys()
            .filter(|key| key.identity == *identity)
            .map(|key| &key.version)
            .collect();
        versions.sort();
        versions
    }

    /// No unresolved edge and not cancelled
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && !self.cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn unresolved(&self) -> &[UnresolvedEdge] {
        &self.unresolved
    }

    /// Depth-first order from `start`; each package appears once
    pub fn dfs(&self, start: &PackageKey) -> Vec<&Package> {
        let Some(&index) = self.node_map.get(start) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, index);
        let mut order = Vec::new();
        while let Some(next) = dfs.next(&self.graph) {
            if let Some(package) = self.graph.node_weight(next) {
                order.push(package);
            }
        }
        order
    }

    /// Breadth-first order from `start`; each package appears once
    pub fn bfs(&self, start: &PackageKey) -> Vec<&Package> {
        let Some(&index) = self.node_map.get(start) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.graph, index);
        let mut order = Vec::new();
        while let Some(next) = bfs.next(&self.graph) {
            if let Some(package) = self.graph.node_weight(next) {
                order.push(package);
            }
        }
        order
    }

    /// Attach advisories to a package; topology is untouched
    pub fn annotate(&mut self, key: &PackageKey, vulnerabilities: Vec<Vulnerability>) -> bool {
        if !self.contains(key) {
            return false;
        }
        let entry = self.vulnerabilities.entry(key.clone()).or_default();
        for vulnerability in vulnerabilities {
            if !entry.iter().any(|v| v.id == vulnerability.id) {
                entry.push(vulnerability);
            }
        }
        entry.sort_by(|a, b| a.id.cmp(&b.id));
        true
    }

    pub fn vulnerabilities(&self, key: &PackageKey) -> &[Vulnerability] {
        self.vulnerabilities.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Packages with at least one advisory
    pub fn vulnerable(&self) -> impl Iterator<Item = (&PackageKey, &[Vulnerability])> {
        self.vulnerabilities
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k, v.as_slice()))
    }

    pub fn summary(&self) -> ResolutionSummary {
        ResolutionSummary {
            complete: self.is_complete(),
            cancelled: self.cancelled,
            nodes: self.node_count(),
            edges: self.edge_count(),
            cycles: self.cycles().len(),
            truncated: self
                .unresolved
                .iter()
                .filter(|edge| edge.cause == UnresolvedCause::DepthExceeded)
                .count(),
            unresolved: self.unresolved.clone(),
        }
    }
}
