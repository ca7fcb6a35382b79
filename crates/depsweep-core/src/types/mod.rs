//! Core data types for depsweep.
//!
//! This module provides the fundamental types used throughout the workspace:
//! - Package identities and concrete versions
//! - Version specs and the per-ecosystem grammar seam
//! - Dependencies, resolved packages and source repositories
//! - Vulnerability records

pub mod dependency;
pub mod identity;
pub mod package;
pub mod repository;
pub mod scheme;
pub mod spec;
pub mod version;
pub mod vulnerability;

// Re-export all public types
pub use dependency::{Dependency, UnparsedDependency};
pub use identity::PackageIdentity;
pub use package::{Package, PackageKey, PackageOrigin};
pub use repository::SourceRepository;
pub use scheme::{parse_default_spec, DefaultScheme, VersionScheme};
pub use spec::{Comparator, Op, VersionSpec};
pub use version::Version;
pub use vulnerability::{AffectedRange, Vulnerability};
