//! Vulnerability data sources

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use depsweep_core::{DepsweepError, PackageIdentity, Vulnerability};

use crate::AuditResult;

/// Advisory database queried by package name.
///
/// Matching is best-effort: sources return every advisory that might concern
/// the name, and the auditor checks versions against the affected ranges.
#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, identity: &PackageIdentity) -> AuditResult<Vec<Vulnerability>>;
}

/// Advisories held in memory, indexed by lowercase affected package name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    advisories: BTreeMap<String, Vec<Vulnerability>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advisories(advisories: impl IntoIterator<Item = Vulnerability>) -> Self {
        let mut source = Self::new();
        for advisory in advisories {
            source.add(advisory);
        }
        source
    }

    /// Index `advisory` under every package name it affects
    pub fn add(&mut self, advisory: Vulnerability) {
        let mut names: Vec<String> = advisory
            .affected
            .iter()
            .map(|range| range.name.to_lowercase())
            .collect();
        names.sort();
        names.dedup();

        for name in names {
            let entry = self.advisories.entry(name).or_default();
            if !entry.iter().any(|existing| existing.id == advisory.id) {
                entry.push(advisory.clone());
            }
        }
    }

    /// Parse a JSON array of advisories
    pub fn from_json_str(content: &str) -> AuditResult<Self> {
        let advisories: Vec<Vulnerability> =
            serde_json::from_str(content).map_err(|e| DepsweepError::ConfigParse {
                message: format!("Invalid advisory database: {}", e),
            })?;
        Ok(Self::with_advisories(advisories))
    }

    /// Load an offline advisory database written as a JSON array
    pub async fn load<P: AsRef<Path>>(path: P) -> AuditResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DepsweepError::io(format!("Failed to read {}", path.display()), e))?;
        let source = Self::from_json_str(&content)?;
        debug!(path = %path.display(), packages = source.len(), "Loaded advisory database");
        Ok(source)
    }

    /// Number of distinct package names with advisories
    pub fn len(&self) -> usize {
        self.advisories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }
}

#[async_trait]
impl VulnerabilitySource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, identity: &PackageIdentity) -> AuditResult<Vec<Vulnerability>> {
        Ok(self
            .advisories
            .get(&identity.name.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}
