//! Matching resolved packages against a vulnerability source

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use depsweep_config::EngineConfig;
use depsweep_core::{PackageIdentity, PackageKey, Vulnerability};
use depsweep_resolver::DependencyGraph;

use crate::source::VulnerabilitySource;

/// A package name the source could not be queried for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuditFailure {
    pub identity: PackageIdentity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Advisories affecting each resolved version, sorted by id
    pub findings: BTreeMap<PackageKey, Vec<Vulnerability>>,
    pub failures: Vec<AuditFailure>,
}

impl AuditReport {
    /// No finding and every query answered
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.failures.is_empty()
    }

    pub fn vulnerable_count(&self) -> usize {
        self.findings.len()
    }

    /// Attach findings to the graph; returns how many packages were annotated
    pub fn apply(&self, graph: &mut DependencyGraph) -> usize {
        let mut annotated = 0;
        for (key, vulnerabilities) in &self.findings {
            if graph.annotate(key, vulnerabilities.clone()) {
                annotated += 1;
            }
        }
        annotated
    }
}

pub struct Auditor {
    source: Arc<dyn VulnerabilitySource>,
    workers: usize,
}

impl Auditor {
    pub fn new(source: Arc<dyn VulnerabilitySource>, workers: usize) -> Self {
        Self {
            source,
            workers: workers.max(1),
        }
    }

    pub fn from_config(source: Arc<dyn VulnerabilitySource>, config: &EngineConfig) -> Self {
        Self::new(source, config.audit_workers)
    }

    /// Query every distinct package name once and match the advisories
    /// against each resolved version. A failed query is recorded in the
    /// report and does not stop the others.
    pub async fn audit(&self, graph: &DependencyGraph) -> AuditReport {
        let identities: BTreeSet<PackageIdentity> = graph.keys().map(|key| key.identity.clone()).collect();
        info!(source = self.source.name(), packages = identities.len(), "Auditing dependency graph");

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for identity in identities {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = source.query(&identity).await;
                (identity, result)
            });
        }

        let mut advisories: BTreeMap<PackageIdentity, Vec<Vulnerability>> = BTreeMap::new();
        let mut report = AuditReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((identity, Ok(found))) => {
                    debug!(identity = %identity, advisories = found.len(), "Queried vulnerability source");
                    advisories.insert(identity, found);
                },
                Ok((identity, Err(e))) => {
                    warn!(identity = %identity, error = %e, "Failed to retrieve vulnerability information");
                    report.failures.push(AuditFailure {
                        identity,
                        message: e.to_string(),
                    });
                },
                Err(e) => warn!(error = %e, "Audit task failed"),
            }
        }
        report.failures.sort();

        for key in graph.keys() {
            let Some(candidates) = advisories.get(&key.identity) else {
                continue;
            };
            let mut matched: Vec<Vulnerability> = candidates.iter().filter(|v| v.affects(key)).cloned().collect();
            if matched.is_empty() {
                continue;
            }
            matched.sort_by(|a, b| a.id.cmp(&b.id));
            matched.dedup_by(|a, b| a.id == b.id);
            report.findings.insert(key.clone(), matched);
        }

        info!(
            vulnerable = report.vulnerable_count(),
            failures = report.failures.len(),
            "Audit finished"
        );
        report
    }

    /// Audit and attach the findings to `graph`
    pub async fn annotate(&self, graph: &mut DependencyGraph) -> AuditReport {
        let report = self.audit(graph).await;
        report.apply(graph);
        report
    }
}

/// Annotate `graph` when the configuration turns auditing on
pub async fn audit_if_enabled(
    config: &EngineConfig,
    source: Arc<dyn VulnerabilitySource>,
    graph: &mut DependencyGraph,
) -> Option<AuditReport> {
    if !config.audit {
        debug!("Audit disabled");
        return None;
    }
    Some(Auditor::from_config(source, config).annotate(graph).await)
}

#[cfg(test)]
mod tests;
