//! Cache keys and the values stored under them

use depsweep_core::{Package, PackageIdentity, PackageKey, VersionSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a cached computation answered
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheKey {
    /// Candidate versions of `identity` satisfying `spec`
    Candidates {
        identity: PackageIdentity,
        spec: VersionSpec,
    },
    /// A package after every dependency updater ran on it
    Updated { package: PackageKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    Candidates(Vec<Package>),
    Updated(Package),
}

impl CacheKey {
    pub fn candidates(identity: PackageIdentity, spec: VersionSpec) -> Self {
        Self::Candidates { identity, spec }
    }

    pub fn updated(package: PackageKey) -> Self {
        Self::Updated { package }
    }
}

impl CacheValue {
    pub fn into_candidates(self) -> Option<Vec<Package>> {
        match self {
            CacheValue::Candidates(packages) => Some(packages),
            CacheValue::Updated(_) => None,
        }
    }

    pub fn into_updated(self) -> Option<Package> {
        match self {
            CacheValue::Updated(package) => Some(package),
            CacheValue::Candidates(_) => None,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Candidates { identity, spec } => write!(f, "candidates {}@{}", identity, spec),
            CacheKey::Updated { package } => write!(f, "updated {}", package),
        }
    }
}
