//! Unit tests for the resolver registry

use super::*;
use async_trait::async_trait;
use depsweep_core::{Dependency, PackageIdentity, Version};

struct Named {
    name: &'static str,
    manifest: Option<&'static str>,
    native: bool,
}

impl Named {
    fn new(name: &'static str) -> Arc<dyn Resolver> {
        Arc::new(Self {
            name,
            manifest: None,
            native: false,
        })
    }
}

#[async_trait]
impl Resolver for Named {
    fn name(&self) -> &str {
        self.name
    }

    async fn resolve(&self, dependency: &Dependency) -> RegistryResult<Vec<Package>> {
        Ok(vec![Package::new(dependency.identity.clone(), Version::new(1, 0, 0))])
    }

    fn can_resolve_from_source(&self, repo: &SourceRepository) -> bool {
        self.manifest.map_or(false, |m| repo.path.ends_with(m))
    }

    fn can_update_dependencies(&self, _package: &Package) -> bool {
        self.native
    }
}

#[test]
fn test_register_and_lookup() {
    let registry = ResolverRegistry::new();
    assert!(registry.is_empty());

    registry.register(Named::new("pip")).unwrap();
    registry.register(Named::new("cargo")).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names(), vec!["cargo".to_string(), "pip".to_string()]);
    assert_eq!(registry.resolver_by_name("pip").unwrap().name(), "pip");
}

#[test]
fn test_duplicate_name_rejected() {
    let registry = ResolverRegistry::new();
    registry.register(Named::new("npm")).unwrap();

    let err = registry.register(Named::new("npm")).unwrap_err();
    assert!(matches!(err, DepsweepError::DuplicateResolver { ref name } if name == "npm"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_unknown_resolver() {
    let registry = ResolverRegistry::with_resolvers([Named::new("go")]).unwrap();
    let err = registry.resolver_by_name("ubuntu").err().unwrap();
    assert!(matches!(err, DepsweepError::UnknownResolver { .. }));
    assert!(err.suggestion().is_some());
}

#[test]
fn test_snapshot_is_detached() {
    let registry = ResolverRegistry::with_resolvers([Named::new("a")]).unwrap();
    let snapshot = registry.resolvers();
    registry.register(Named::new("b")).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(registry.resolvers().len(), 2);
}

#[test]
fn test_source_resolvers_and_updaters() {
    let registry = ResolverRegistry::new();
    registry
        .register(Arc::new(Named {
            name: "cargo",
            manifest: Some("rust-app"),
            native: false,
        }))
        .unwrap();
    registry
        .register(Arc::new(Named {
            name: "native",
            manifest: None,
            native: true,
        }))
        .unwrap();

    let repo = SourceRepository::new("/work/rust-app");
    let names: Vec<_> = registry
        .source_resolvers(&repo)
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, vec!["cargo"]);

    let pkg = Package::new(PackageIdentity::new("cargo", "openssl-sys"), Version::new(0, 9, 0));
    assert_eq!(registry.updaters_for(&pkg).len(), 1);
}

#[test]
fn test_global_registry() {
    let name = "global-test-ecosystem";
    register_global(Arc::new(Named {
        name,
        manifest: None,
        native: false,
    }))
    .unwrap();

    assert!(global().get(name).is_some());
    assert!(register_global(Named::new("global-test-ecosystem")).is_err());
}
