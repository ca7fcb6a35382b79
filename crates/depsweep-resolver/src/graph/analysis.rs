//! Whole-graph queries: cycles, ordering, distances, comparison

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};

use depsweep_core::utils::Fingerprint;
use depsweep_core::{Package, PackageIdentity, PackageKey, VersionSpec};

use super::DependencyGraph;

/// Requirers of one single-version identity whose specs cannot all hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementConflict {
    pub identity: PackageIdentity,
    /// (requirer, declared spec), sorted by requirer
    pub requirements: Vec<(PackageKey, VersionSpec)>,
}

impl DependencyGraph {
    fn key_at(&self, index: NodeIndex) -> Option<PackageKey> {
        self.graph.node_weight(index).map(Package::key)
    }

    /// Strongly connected components that form a cycle, each sorted
    pub fn cycles(&self) -> Vec<Vec<PackageKey>> {
        let mut cycles: Vec<Vec<PackageKey>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.first().map_or(false, |&n| self.graph.contains_edge(n, n))
            })
            .map(|scc| {
                let mut keys: Vec<PackageKey> = scc.into_iter().filter_map(|n| self.key_at(n)).collect();
                keys.sort();
                keys
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Dependents before their dependencies, or the cycle preventing it
    pub fn topological_order(&self) -> Result<Vec<PackageKey>, Vec<PackageKey>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().filter_map(|n| self.key_at(n)).collect()),
            Err(cycle) => {
                let Some(key) = self.key_at(cycle.node_id()) else {
                    return Err(Vec::new());
                };
                Err(self
                    .cycles()
                    .into_iter()
                    .find(|c| c.contains(&key))
                    .unwrap_or_else(|| vec![key]))
            },
        }
    }

    /// Shortest edge count from any root, for every reachable package
    pub fn distance_from_roots(&self) -> BTreeMap<PackageKey, usize> {
        let mut distances: BTreeMap<NodeIndex, usize> = BTreeMap::new();
        let mut queue = VecDeque::new();
        for &root in &self.roots {
            if distances.insert(root, 0).is_none() {
                queue.push_back(root);
            }
        }

        while let Some(current) = queue.pop_front() {
            let next = distances.get(&current).map_or(0, |d| d + 1);
            for edge in self.graph.edges(current) {
                let target = edge.target();
                if !distances.contains_key(&target) {
                    distances.insert(target, next);
                    queue.push_back(target);
                }
            }
        }

        distances
            .into_iter()
            .filter_map(|(index, distance)| Some((self.key_at(index)?, distance)))
            .collect()
    }

    /// Jaccard index over normalized node identities, in `[0, 1]`.
    /// Two empty graphs are identical.
    pub fn similarity(&self, other: &DependencyGraph) -> f64 {
        let ours: HashSet<String> = self.keys().map(normalized).collect();
        let theirs: HashSet<String> = other.keys().map(normalized).collect();

        let union = ours.union(&theirs).count();
        if union == 0 {
            return 1.0;
        }
        ours.intersection(&theirs).count() as f64 / union as f64
    }

    /// Stable hash of the node set, edge set and unresolved edges
    pub fn fingerprint(&self) -> String {
        let mut fingerprint = Fingerprint::new();

        let mut keys: Vec<&PackageKey> = self.keys().collect();
        keys.sort();
        for key in keys {
            fingerprint.record(&key.to_string());
        }

        for (from, dependency, to) in self.edges() {
            fingerprint.record(&format!("{} -[{}]-> {}", from, dependency.spec, to));
        }

        let mut unresolved = self.unresolved.clone();
        unresolved.sort();
        for edge in &unresolved {
            fingerprint.record(&edge.to_string());
        }

        fingerprint.finish()
    }

    /// Identities in single-version ecosystems whose requirers' specs have
    /// no version in common. Informational only; nothing is removed.
    pub fn requirement_conflicts<F>(&self, single_version: F) -> Vec<RequirementConflict>
    where
        F: Fn(&str) -> bool,
    {
        let mut by_identity: BTreeMap<PackageIdentity, Vec<(PackageKey, VersionSpec)>> = BTreeMap::new();
        for package in self.nodes() {
            for dependency in &package.dependencies {
                if single_version(&dependency.identity.ecosystem) {
                    by_identity
                        .entry(dependency.identity.clone())
                        .or_default()
                        .push((package.key(), dependency.spec.clone()));
                }
            }
        }

        by_identity
            .into_iter()
            .filter_map(|(identity, mut requirements)| {
                requirements.sort_by(|a, b| a.0.cmp(&b.0));
                let combined = requirements
                    .iter()
                    .try_fold(VersionSpec::any(), |acc, (_, spec)| acc.intersect(spec));
                match combined {
                    Ok(_) => None,
                    Err(_) => Some(RequirementConflict {
                        identity,
                        requirements,
                    }),
                }
            })
            .collect()
    }
}

fn normalized(key: &PackageKey) -> String {
    format!(
        "{}:{}@{}",
        key.identity.ecosystem.to_lowercase(),
        key.identity.name.to_lowercase(),
        key.version.canonical()
    )
}
