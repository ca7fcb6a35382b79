//! Dependency resolution engine for depsweep
//!
//! This crate expands root dependencies into every package version reachable
//! under any valid resolution, not a single install plan. Expansion fans out
//! over a bounded worker pool, deduplicates external work through the
//! package cache and records every failure as an unresolved edge instead of
//! aborting the run.

pub mod builder;
pub mod engine;
pub mod graph;
pub mod partial;
pub mod summary;

// Re-export main types
pub use engine::{CancelHandle, Engine, Root};
pub use graph::{
    DependencyGraph, ExchangeEdge, ExchangeNode, GraphExchange, RequirementConflict, SbomComponent,
    SbomDocument, SbomRelationship,
};
pub use partial::PartialResolution;
pub use summary::{ResolutionSummary, UnresolvedCause, UnresolvedEdge};

use depsweep_core::error::DepsweepError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, DepsweepError>;
