//! Vulnerability audit for depsweep
//!
//! Runs after resolution: every package identity in a finished
//! [`DependencyGraph`](depsweep_resolver::DependencyGraph) is looked up in a
//! [`VulnerabilitySource`], advisories are matched against each resolved
//! version, and matches are attached to the graph as annotations. Graph
//! topology is never changed.

pub mod auditor;
pub mod source;

// Re-export main types
pub use auditor::{audit_if_enabled, AuditFailure, AuditReport, Auditor};
pub use source::{MemorySource, VulnerabilitySource};

use depsweep_core::error::DepsweepError;

/// Result type for audit operations
pub type AuditResult<T> = Result<T, DepsweepError>;
