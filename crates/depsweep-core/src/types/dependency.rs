//! Dependency declarations: an identity plus the spec a requirer accepts.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Package, PackageIdentity, VersionScheme, VersionSpec};
use crate::error::{DepsweepError, DepsweepResult};

/// An edge-in-waiting owned by whichever package declares it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub identity: PackageIdentity,
    pub spec: VersionSpec,
}

/// A declared dependency whose spec could not be parsed.
///
/// Kept on the package so the engine can report the edge as unresolved
/// instead of dropping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnparsedDependency {
    pub identity: PackageIdentity,
    pub raw_spec: String,
    pub reason: String,
}

impl Dependency {
    pub fn new(identity: PackageIdentity, spec: VersionSpec) -> Self {
        Self { identity, spec }
    }

    /// Dependency accepting any version
    pub fn any(identity: PackageIdentity) -> Self {
        Self::new(identity, VersionSpec::any())
    }

    /// Parse the `ecosystem:name@spec` form; a missing spec means `*`.
    ///
    /// A leading `@` in the name (npm scopes) is part of the name.
    pub fn parse(input: &str, scheme: &dyn VersionScheme) -> DepsweepResult<Self> {
        let (ecosystem, rest) = input
            .split_once(':')
            .ok_or_else(|| DepsweepError::invalid_spec(input, "expected 'ecosystem:name[@spec]'"))?;

        let split_at = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '@')
            .map(|(i, _)| i);
        let (name, raw_spec) = match split_at {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };

        if ecosystem.is_empty() || name.is_empty() {
            return Err(DepsweepError::invalid_spec(
                input,
                "ecosystem and name must both be non-empty",
            ));
        }

        let identity = PackageIdentity::normalized(ecosystem, name, scheme);
        let spec = scheme.parse_spec(raw_spec)?;
        Ok(Self::new(identity, spec))
    }

    /// Check whether a concrete package satisfies this dependency
    pub fn matches(&self, package: &Package) -> bool {
        package.identity == self.identity && self.spec.matches(&package.version)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.spec)
    }
}

impl fmt::Display for UnparsedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.raw_spec)
    }
}
