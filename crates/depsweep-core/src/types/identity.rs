//! Package identity: an ecosystem tag plus a normalized name.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::VersionScheme;
use crate::error::{DepsweepError, DepsweepResult};

/// (ecosystem, name) pair; equality is exact after normalization
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub ecosystem: String,
    pub name: String,
}

impl PackageIdentity {
    /// Create an identity from an already-normalized name
    pub fn new(ecosystem: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            name: name.into(),
        }
    }

    /// Create an identity, normalizing the name with the ecosystem's scheme
    pub fn normalized(ecosystem: impl Into<String>, name: &str, scheme: &dyn VersionScheme) -> Self {
        Self::new(ecosystem, scheme.normalize_name(name))
    }

    /// Parse the `ecosystem:name` form
    pub fn parse(input: &str) -> DepsweepResult<Self> {
        let (ecosystem, name) = input
            .split_once(':')
            .ok_or_else(|| DepsweepError::invalid_spec(input, "expected 'ecosystem:name'"))?;
        if ecosystem.is_empty() || name.is_empty() {
            return Err(DepsweepError::invalid_spec(
                input,
                "ecosystem and name must both be non-empty",
            ));
        }
        Ok(Self::new(ecosystem, name))
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ecosystem, self.name)
    }
}
