//! Export records: SBOM, node/edge exchange, package listing
//!
//! These are the data shapes renderers consume; field naming and file
//! formats beyond JSON belong to the renderers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use depsweep_core::PackageKey;

use super::DependencyGraph;
use crate::summary::UnresolvedEdge;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomComponent {
    /// `ecosystem:name@version`
    pub bom_ref: String,
    pub ecosystem: String,
    pub name: String,
    pub version: String,
    pub is_source: bool,
    pub root: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomRelationship {
    pub from: String,
    pub to: String,
    pub spec: String,
}

/// Component list plus relationship list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomDocument {
    pub complete: bool,
    pub components: Vec<SbomComponent>,
    pub relationships: Vec<SbomRelationship>,
    pub unresolved: Vec<UnresolvedEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeNode {
    pub id: usize,
    pub label: String,
    pub ecosystem: String,
    pub name: String,
    pub version: String,
    pub root: bool,
    pub vulnerable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEdge {
    pub source: usize,
    pub target: usize,
    pub label: String,
}

/// Generic node/edge document for visualization tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExchange {
    pub complete: bool,
    pub nodes: Vec<ExchangeNode>,
    pub edges: Vec<ExchangeEdge>,
}

impl DependencyGraph {
    fn sorted_keys(&self) -> Vec<&PackageKey> {
        let mut keys: Vec<&PackageKey> = self.keys().collect();
        keys.sort();
        keys
    }

    fn is_root(&self, key: &PackageKey) -> bool {
        self.node_map
            .get(key)
            .map_or(false, |index| self.roots.contains(index))
    }

    pub fn to_sbom(&self) -> SbomDocument {
        let components = self
            .sorted_keys()
            .into_iter()
            .filter_map(|key| {
                let package = self.node(key)?;
                Some(SbomComponent {
                    bom_ref: key.to_string(),
                    ecosystem: key.identity.ecosystem.clone(),
                    name: key.identity.name.clone(),
                    version: package.version.to_string(),
                    is_source: package.is_source(),
                    root: self.is_root(key),
                    vulnerabilities: self.vulnerabilities(key).iter().map(|v| v.id.clone()).collect(),
                })
            })
            .collect();

        let relationships = self
            .edges()
            .into_iter()
            .map(|(from, dependency, to)| SbomRelationship {
                from: from.key().to_string(),
                to: to.key().to_string(),
                spec: dependency.spec.to_string(),
            })
            .collect();

        let mut unresolved = self.unresolved().to_vec();
        unresolved.sort();

        SbomDocument {
            complete: self.is_complete(),
            components,
            relationships,
            unresolved,
        }
    }

    pub fn to_exchange(&self) -> GraphExchange {
        let keys = self.sorted_keys();
        let ids: HashMap<PackageKey, usize> = keys
            .iter()
            .enumerate()
            .map(|(id, key)| ((*key).clone(), id))
            .collect();

        let nodes = keys
            .iter()
            .enumerate()
            .map(|(id, key)| ExchangeNode {
                id,
                label: key.to_string(),
                ecosystem: key.identity.ecosystem.clone(),
                name: key.identity.name.clone(),
                version: key.version.to_string(),
                root: self.is_root(key),
                vulnerable: !self.vulnerabilities(key).is_empty(),
            })
            .collect();

        let edges = self
            .edges()
            .into_iter()
            .filter_map(|(from, dependency, to)| {
                Some(ExchangeEdge {
                    source: *ids.get(&from.key())?,
                    target: *ids.get(&to.key())?,
                    label: dependency.spec.to_string(),
                })
            })
            .collect();

        GraphExchange {
            complete: self.is_complete(),
            nodes,
            edges,
        }
    }

    /// `{"eco:name": {"version": {"dependencies": {...}, "vulnerabilities": [...], "is_source_package": bool}}}`
    pub fn to_package_json(&self) -> Value {
        let mut listing: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();

        for key in self.sorted_keys() {
            let Some(package) = self.node(key) else {
                continue;
            };

            let dependencies: IndexMap<String, String> = package
                .dependencies
                .iter()
                .map(|d| (d.identity.to_string(), d.spec.to_string()))
                .chain(
                    package
                        .unparsed
                        .iter()
                        .map(|u| (u.identity.to_string(), u.raw_spec.clone())),
                )
                .collect();

            listing.entry(key.identity.to_string()).or_default().insert(
                package.version.to_string(),
                json!({
                    "dependencies": dependencies,
                    "vulnerabilities": self.vulnerabilities(key),
                    "is_source_package": package.is_source(),
                }),
            );
        }

        json!(listing)
    }
}
