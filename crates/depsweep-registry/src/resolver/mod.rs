//! The per-ecosystem resolver contract

use async_trait::async_trait;
use depsweep_core::{DefaultScheme, Dependency, Package, SourceRepository, VersionScheme};

use crate::RegistryResult;

/// Whether a resolver's backend (ecosystem tool, registry) can be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Ecosystem adapter consumed by the resolution engine.
///
/// Resolvers only produce candidate data. They never touch the cache or the
/// graph, so the engine can call them from any worker.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Unique ecosystem tag, matched against `PackageIdentity::ecosystem`
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Version and spec grammar of this ecosystem
    fn scheme(&self) -> &dyn VersionScheme {
        &DefaultScheme
    }

    /// Whether several versions of one package can be installed side by side
    fn allows_multiple_versions(&self) -> bool {
        true
    }

    /// Check the backend before a run
    fn availability(&self) -> Availability {
        Availability::Available
    }

    /// Every published version satisfying the dependency, most-preferred first
    async fn resolve(&self, dependency: &Dependency) -> RegistryResult<Vec<Package>>;

    /// Whether this resolver recognizes a manifest in the repository
    fn can_resolve_from_source(&self, _repo: &SourceRepository) -> bool {
        false
    }

    /// Extract the repository's first-level dependencies as a source package
    async fn resolve_from_source(&self, _repo: &SourceRepository) -> RegistryResult<Option<Package>> {
        Ok(None)
    }

    /// Whether this resolver can add dependencies to a package of any ecosystem
    fn can_update_dependencies(&self, _package: &Package) -> bool {
        false
    }

    /// Return the package with augmented dependencies
    async fn update_dependencies(&self, package: Package) -> RegistryResult<Package> {
        Ok(package)
    }
}
