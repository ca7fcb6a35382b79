//! Unit tests for the auditor

use super::*;
use async_trait::async_trait;
use depsweep_core::{AffectedRange, DefaultScheme, DepsweepError, Package, Version, VersionScheme};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::source::MemorySource;
use crate::AuditResult;

fn advisory(id: &str, name: &str, spec: &str) -> Vulnerability {
    Vulnerability {
        id: id.to_string(),
        aliases: vec![format!("CVE-{}", id)],
        summary: format!("{} is affected", name),
        affected: vec![AffectedRange {
            ecosystem: None,
            name: name.to_string(),
            spec: DefaultScheme.parse_spec(spec).unwrap(),
        }],
    }
}

fn graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (name, version) in [("jinja2", "3.1.2"), ("jinja2", "3.1.4"), ("flask", "3.0.0"), ("click", "8.1.7")] {
        graph.add_package(Package::new(
            PackageIdentity::new("pip", name),
            Version::parse(version).unwrap(),
        ));
    }
    graph
}

fn key(name: &str, version: &str) -> PackageKey {
    PackageKey::new(PackageIdentity::new("pip", name), Version::parse(version).unwrap())
}

/// Counts queries and fails for one name
struct Counting {
    inner: MemorySource,
    failing: &'static str,
    queries: AtomicUsize,
}

#[async_trait]
impl VulnerabilitySource for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn query(&self, identity: &PackageIdentity) -> AuditResult<Vec<Vulnerability>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if identity.name == self.failing {
            return Err(DepsweepError::backend("osv", "HTTP 503"));
        }
        self.inner.query(identity).await
    }
}

#[tokio::test]
async fn test_matches_versions_against_ranges() {
    let source = MemorySource::with_advisories([
        advisory("GHSA-0001", "Jinja2", "<3.1.3"),
        advisory("GHSA-0002", "click", ">=9"),
    ]);
    let auditor = Auditor::new(Arc::new(source), 4);

    let report = auditor.audit(&graph()).await;

    assert_eq!(report.vulnerable_count(), 1);
    assert_eq!(report.findings[&key("jinja2", "3.1.2")][0].id, "GHSA-0001");
    assert!(!report.findings.contains_key(&key("jinja2", "3.1.4")));
    assert!(!report.findings.contains_key(&key("click", "8.1.7")));
    assert!(report.failures.is_empty());
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_one_query_per_identity_and_failures_collected() {
    let source = Arc::new(Counting {
        inner: MemorySource::with_advisories([advisory("GHSA-0001", "jinja2", "*")]),
        failing: "flask",
        queries: AtomicUsize::new(0),
    });
    let auditor = Auditor::new(source.clone(), 2);

    let report = auditor.audit(&graph()).await;

    assert_eq!(source.queries.load(Ordering::SeqCst), 3);
    assert_eq!(report.vulnerable_count(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].identity.name, "flask");
    assert!(report.failures[0].message.contains("503"));
}

#[tokio::test]
async fn test_annotate_keeps_topology() {
    let mut graph = graph();
    let nodes = graph.node_count();
    let edges = graph.edge_count();
    let auditor = Auditor::new(Arc::new(MemorySource::with_advisories([advisory("GHSA-0001", "jinja2", "*")])), 1);

    let report = auditor.annotate(&mut graph).await;

    assert_eq!(report.vulnerable_count(), 2);
    assert_eq!(graph.node_count(), nodes);
    assert_eq!(graph.edge_count(), edges);
    assert_eq!(graph.vulnerabilities(&key("jinja2", "3.1.4")).len(), 1);
    assert_eq!(graph.vulnerable().count(), 2);
    assert_eq!(graph.to_sbom().components.iter().filter(|c| !c.vulnerabilities.is_empty()).count(), 2);
}

#[tokio::test]
async fn test_audit_respects_config_switch() {
    let source: Arc<dyn VulnerabilitySource> =
        Arc::new(MemorySource::with_advisories([advisory("GHSA-0001", "flask", "*")]));
    let mut graph = graph();

    let disabled = EngineConfig::default();
    assert!(audit_if_enabled(&disabled, Arc::clone(&source), &mut graph).await.is_none());
    assert_eq!(graph.vulnerable().count(), 0);

    let enabled = EngineConfig::default().with_audit(true);
    let report = audit_if_enabled(&enabled, source, &mut graph).await.unwrap();
    assert_eq!(report.vulnerable_count(), 1);
    assert_eq!(graph.vulnerable().count(), 1);
}

#[tokio::test]
async fn test_empty_graph_is_clean() {
    let auditor = Auditor::new(Arc::new(MemorySource::new()), 0);
    let report = auditor.audit(&DependencyGraph::new()).await;
    assert!(report.is_clean());
    assert_eq!(report.apply(&mut DependencyGraph::new()), 0);
}
