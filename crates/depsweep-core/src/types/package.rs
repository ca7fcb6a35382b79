//! Concrete resolved packages.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Dependency, PackageIdentity, SourceRepository, UnparsedDependency, Version, VersionScheme};

/// Where a package's dependency list came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackageOrigin {
    /// Published version reported by a registry or ecosystem tool
    Registry,
    /// Local checkout; dependencies were statically extracted
    Source { repository: SourceRepository },
}

/// One concrete, resolved node. Never mutated once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub identity: PackageIdentity,
    pub version: Version,
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<UnparsedDependency>,
    pub origin: PackageOrigin,
}

/// Node identity for deduplication: (ecosystem, name, version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageKey {
    pub identity: PackageIdentity,
    pub version: Version,
}

impl Package {
    /// Create a registry package without dependencies
    pub fn new(identity: PackageIdentity, version: Version) -> Self {
        Self {
            identity,
            version,
            dependencies: Vec::new(),
            unparsed: Vec::new(),
            origin: PackageOrigin::Registry,
        }
    }

    /// Create a package whose dependencies come from a source checkout
    pub fn from_source(identity: PackageIdentity, version: Version, repository: SourceRepository) -> Self {
        Self {
            origin: PackageOrigin::Source { repository },
            ..Self::new(identity, version)
        }
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Declare a dependency from its raw spec string.
    ///
    /// An unparsable spec is kept as an [`UnparsedDependency`] so the edge
    /// shows up as unresolved rather than vanishing.
    pub fn with_declared(mut self, identity: PackageIdentity, raw_spec: &str, scheme: &dyn VersionScheme) -> Self {
        match scheme.parse_spec(raw_spec) {
            Ok(spec) => self.dependencies.push(Dependency::new(identity, spec)),
            Err(e) => self.unparsed.push(UnparsedDependency {
                identity,
                raw_spec: raw_spec.to_string(),
                reason: e.to_string(),
            }),
        }
        self
    }

    pub fn key(&self) -> PackageKey {
        PackageKey {
            identity: self.identity.clone(),
            version: self.version.clone(),
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self.origin, PackageOrigin::Source { .. })
    }
}

impl PackageKey {
    pub fn new(identity: PackageIdentity, version: Version) -> Self {
        Self { identity, version }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.version)
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.version)
    }
}
