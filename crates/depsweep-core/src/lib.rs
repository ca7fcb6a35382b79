//! # depsweep-core
//!
//! Core types and utilities shared across all depsweep crates.
//!
//! This crate provides:
//! - Package identities, concrete versions and version specs with an
//!   ecosystem-agnostic algebra (`matches`, `intersect`, total ordering)
//! - The `VersionScheme` seam each ecosystem uses to plug in its own grammar
//! - Package, dependency, source repository and vulnerability types
//! - DepsweepError enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, VersionSpec, Package, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Hashing and path helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{DepsweepError, DepsweepResult};
pub use types::{
    AffectedRange, Comparator, DefaultScheme, Dependency, Op, Package, PackageIdentity, PackageKey,
    PackageOrigin, SourceRepository, UnparsedDependency, Version, VersionScheme, VersionSpec,
    Vulnerability,
};
