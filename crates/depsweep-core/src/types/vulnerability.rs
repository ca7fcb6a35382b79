//! Known-vulnerability records matched against resolved packages.

use serde::{Deserialize, Serialize};

use super::{PackageKey, VersionSpec};

/// Versions of one package an advisory applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffectedRange {
    /// Advisory ecosystem name; `None` matches any ecosystem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem: Option<String>,
    pub name: String,
    pub spec: VersionSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub summary: String,
    pub affected: Vec<AffectedRange>,
}

impl AffectedRange {
    /// Best-effort match: names compare case-insensitively and advisory
    /// ecosystems rarely share tags with resolvers, so a missing ecosystem
    /// matches everything.
    pub fn affects(&self, key: &PackageKey) -> bool {
        let ecosystem_matches = self
            .ecosystem
            .as_deref()
            .map_or(true, |eco| eco.eq_ignore_ascii_case(&key.identity.ecosystem));
        ecosystem_matches
            && self.name.eq_ignore_ascii_case(&key.identity.name)
            && self.spec.matches(&key.version)
    }
}

impl Vulnerability {
    pub fn affects(&self, key: &PackageKey) -> bool {
        self.affected.iter().any(|range| range.affects(key))
    }
}
