//! The active call path of one expansion branch
//!
//! Each branch carries the (identity, spec) pairs it is currently expanding.
//! Paths are persistent linked lists: extending a path shares the parent, so
//! sibling branches fork it without copying.

use depsweep_core::Dependency;
use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    dependency: Dependency,
    parent: Option<Arc<Frame>>,
}

#[derive(Debug, Clone, Default)]
pub struct PartialResolution {
    head: Option<Arc<Frame>>,
    len: usize,
}

impl PartialResolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new path with `dependency` on top; `self` is unchanged
    pub fn push(&self, dependency: Dependency) -> Self {
        Self {
            head: Some(Arc::new(Frame {
                dependency,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Active dependencies, innermost first
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
            .map(|frame| &frame.dependency)
    }

    /// Whether expanding `dependency` would re-enter an active expansion
    pub fn closes_cycle(&self, dependency: &Dependency) -> bool {
        self.iter().any(|active| active == dependency)
    }

    /// First active dependency on the same identity whose spec overlaps
    pub fn overlapping(&self, dependency: &Dependency) -> Option<&Dependency> {
        self.iter()
            .find(|active| active.identity == dependency.identity && active.spec.intersects(&dependency.spec))
    }

    /// Active path, outermost first
    pub fn to_vec(&self) -> Vec<Dependency> {
        let mut path: Vec<Dependency> = self.iter().cloned().collect();
        path.reverse();
        path
    }
}
