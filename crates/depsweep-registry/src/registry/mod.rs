//! Process-wide set of ecosystem resolvers

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use depsweep_core::{DepsweepError, Package, SourceRepository};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::resolver::Resolver;
use crate::RegistryResult;

static GLOBAL: Lazy<Arc<ResolverRegistry>> = Lazy::new(|| Arc::new(ResolverRegistry::new()));

/// The process-wide registry ecosystem adapters register into at startup
pub fn global() -> Arc<ResolverRegistry> {
    Arc::clone(&GLOBAL)
}

/// Register a resolver into the process-wide registry
pub fn register_global(resolver: Arc<dyn Resolver>) -> RegistryResult<()> {
    GLOBAL.register(resolver)
}

/// Resolvers keyed by their unique ecosystem tag
pub struct ResolverRegistry {
    resolvers: RwLock<BTreeMap<String, Arc<dyn Resolver>>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self {
            resolvers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a registry from a fixed set of resolvers
    pub fn with_resolvers(resolvers: impl IntoIterator<Item = Arc<dyn Resolver>>) -> RegistryResult<Self> {
        let registry = Self::new();
        for resolver in resolvers {
            registry.register(resolver)?;
        }
        Ok(registry)
    }

    /// Add a resolver; its name must not be taken
    pub fn register(&self, resolver: Arc<dyn Resolver>) -> RegistryResult<()> {
        let name = resolver.name().to_string();
        let mut resolvers = self.resolvers.write();
        if resolvers.contains_key(&name) {
            return Err(DepsweepError::DuplicateResolver { name });
        }

        info!(resolver = %name, "Registered resolver");
        resolvers.insert(name, resolver);
        Ok(())
    }

    /// Read-only snapshot of every registered resolver, ordered by name
    pub fn resolvers(&self) -> Vec<Arc<dyn Resolver>> {
        self.resolvers.read().values().cloned().collect()
    }

    /// Registered ecosystem tags, sorted
    pub fn names(&self) -> Vec<String> {
        self.resolvers.read().keys().cloned().collect()
    }

    /// Look up a resolver by ecosystem tag
    pub fn resolver_by_name(&self, name: &str) -> RegistryResult<Arc<dyn Resolver>> {
        self.get(name).ok_or_else(|| DepsweepError::UnknownResolver {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Resolver>> {
        self.resolvers.read().get(name).cloned()
    }

    /// Resolvers that recognize a manifest in the repository
    pub fn source_resolvers(&self, repo: &SourceRepository) -> Vec<Arc<dyn Resolver>> {
        let matching: Vec<_> = self
            .resolvers()
            .into_iter()
            .filter(|r| r.can_resolve_from_source(repo))
            .collect();
        debug!(repo = %repo, count = matching.len(), "Found source resolvers");
        matching
    }

    /// Resolvers that want to augment the package's dependencies
    pub fn updaters_for(&self, package: &Package) -> Vec<Arc<dyn Resolver>> {
        self.resolvers()
            .into_iter()
            .filter(|r| r.can_update_dependencies(package))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resolvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.read().is_empty()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("resolvers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests;
