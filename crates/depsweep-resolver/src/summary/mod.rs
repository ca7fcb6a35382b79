//! Unresolved edges and the run-level completeness report

use depsweep_core::{DepsweepError, PackageIdentity, PackageKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a dependency edge has no resolved target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedCause {
    /// The declared spec could not be parsed
    InvalidSpecification,
    /// The resolver could not reach its backend
    BackendUnavailable,
    /// No resolver is registered for the ecosystem
    NoResolver,
    /// The resolver reported no version satisfying the spec
    NoCandidates,
    /// The requiring package sits at the depth limit
    DepthExceeded,
    /// The run was cancelled before the edge was expanded
    Cancelled,
}

impl UnresolvedCause {
    /// Classify a resolver failure
    pub fn from_error(error: &DepsweepError) -> Self {
        match error {
            DepsweepError::InvalidSpecification { .. } => UnresolvedCause::InvalidSpecification,
            DepsweepError::Unsatisfiable { .. } => UnresolvedCause::NoCandidates,
            DepsweepError::UnknownResolver { .. } => UnresolvedCause::NoResolver,
            DepsweepError::Cancelled => UnresolvedCause::Cancelled,
            _ => UnresolvedCause::BackendUnavailable,
        }
    }
}

impl fmt::Display for UnresolvedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnresolvedCause::InvalidSpecification => "invalid specification",
            UnresolvedCause::BackendUnavailable => "backend unavailable",
            UnresolvedCause::NoResolver => "no resolver",
            UnresolvedCause::NoCandidates => "no candidates",
            UnresolvedCause::DepthExceeded => "depth exceeded",
            UnresolvedCause::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// A declared dependency edge that was not expanded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnresolvedEdge {
    /// Requiring package; `None` for a root dependency
    pub from: Option<PackageKey>,
    pub identity: PackageIdentity,
    /// Spec as declared
    pub spec: String,
    pub cause: UnresolvedCause,
    pub message: String,
}

impl fmt::Display for UnresolvedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(from) => write!(f, "{} -> {}@{}", from, self.identity, self.spec)?,
            None => write!(f, "<root> -> {}@{}", self.identity, self.spec)?,
        }
        write!(f, ": {}", self.cause)?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

/// What a caller needs to tell a partial result from a complete one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub complete: bool,
    pub cancelled: bool,
    pub nodes: usize,
    pub edges: usize,
    /// Strongly connected components with more than one package or a self-loop
    pub cycles: usize,
    /// Edges cut by the depth limit
    pub truncated: usize,
    pub unresolved: Vec<UnresolvedEdge>,
}

impl fmt::Display for ResolutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packages, {} edges, {} cycles, {} unresolved",
            self.nodes,
            self.edges,
            self.cycles,
            self.unresolved.len()
        )?;
        if self.truncated > 0 {
            write!(f, " ({} truncated by depth)", self.truncated)?;
        }
        if self.cancelled {
            write!(f, " [cancelled]")?;
        }
        if !self.complete {
            write!(f, " [partial]")?;
        }
        Ok(())
    }
}
