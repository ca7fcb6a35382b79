//! Version specs: constraints over [`Version`] with membership and
//! intersection.
//!
//! A spec is kept in disjunctive normal form: a list of clauses, each clause
//! a conjunction of primitive comparators. Ecosystem sugar (`^`, `~`, `~=`,
//! wildcards) is desugared into comparators at parse time, so the algebra
//! below never needs to know which ecosystem a spec came from.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::scheme::parse_default_spec;
use super::Version;
use crate::error::{DepsweepError, DepsweepResult};

/// Primitive comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Version constraint: any clause may match, every comparator in a clause must.
///
/// Serialised as its display string (`>=1.0,<2 || ^3`), read back with the
/// default grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSpec {
    clauses: Vec<Vec<Comparator>>,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        }
    }
}

impl Comparator {
    pub fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Eq => version == &self.version,
            Op::Ne => version != &self.version,
            Op::Gt => version > &self.version,
            Op::Ge => version >= &self.version,
            Op::Lt => version < &self.version,
            Op::Le => version <= &self.version,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// One side of an interval while checking a clause for satisfiability
#[derive(Debug, Clone)]
struct Bound<'a> {
    version: &'a Version,
    inclusive: bool,
}

/// Whether at least one version can satisfy every comparator of `clause`.
///
/// The version space is treated as dense: between any two distinct versions
/// there is always another one (a longer release or a prerelease).
fn clause_is_satisfiable(clause: &[Comparator]) -> bool {
    let mut lower: Option<Bound<'_>> = None;
    let mut upper: Option<Bound<'_>> = None;
    let mut exact: Option<&Version> = None;
    let mut excluded: Vec<&Version> = Vec::new();

    for comparator in clause {
        let version = &comparator.version;
        match comparator.op {
            Op::Eq => match exact {
                Some(existing) if existing != version => return false,
                _ => exact = Some(version),
            },
            Op::Ne => excluded.push(version),
            Op::Gt | Op::Ge => {
                let inclusive = comparator.op == Op::Ge;
                lower = Some(match lower {
                    Some(b) if b.version > version => b,
                    Some(b) if b.version == version => Bound {
                        version,
                        inclusive: b.inclusive && inclusive,
                    },
                    _ => Bound { version, inclusive },
                });
            },
            Op::Lt | Op::Le => {
                let inclusive = comparator.op == Op::Le;
                upper = Some(match upper {
                    Some(b) if b.version < version => b,
                    Some(b) if b.version == version => Bound {
                        version,
                        inclusive: b.inclusive && inclusive,
                    },
                    _ => Bound { version, inclusive },
                });
            },
        }
    }

    if let Some(point) = exact {
        return clause.iter().all(|c| c.matches(point));
    }

    match (lower, upper) {
        (Some(lo), Some(hi)) => {
            if lo.version > hi.version {
                false
            } else if lo.version == hi.version {
                lo.inclusive && hi.inclusive && !excluded.contains(&lo.version)
            } else {
                true
            }
        },
        _ => true,
    }
}

impl VersionSpec {
    /// Spec matching every version (`*`)
    pub fn any() -> Self {
        Self {
            clauses: vec![Vec::new()],
        }
    }

    /// Spec matching exactly one version
    pub fn exact(version: Version) -> Self {
        Self::from_comparators(vec![Comparator::new(Op::Eq, version)])
    }

    /// Spec made of a single conjunctive clause
    pub fn from_comparators(comparators: Vec<Comparator>) -> Self {
        Self {
            clauses: vec![comparators],
        }
    }

    /// Build a spec from clauses, dropping those no version can satisfy
    pub fn from_clauses(clauses: Vec<Vec<Comparator>>) -> DepsweepResult<Self> {
        let rendered = Self {
            clauses: clauses.clone(),
        }
        .to_string();
        let mut kept: Vec<Vec<Comparator>> = Vec::new();
        for clause in clauses {
            if clause_is_satisfiable(&clause) && !kept.contains(&clause) {
                kept.push(clause);
            }
        }
        if kept.is_empty() {
            return Err(DepsweepError::Unsatisfiable {
                left: rendered.clone(),
                right: rendered,
            });
        }
        Ok(Self::collapse(kept))
    }

    /// An unconstrained clause absorbs every other one
    fn collapse(clauses: Vec<Vec<Comparator>>) -> Self {
        if clauses.iter().any(|clause| clause.is_empty()) {
            Self::any()
        } else {
            Self { clauses }
        }
    }

    pub fn clauses(&self) -> &[Vec<Comparator>] {
        &self.clauses
    }

    /// Check if this spec places no constraint at all
    pub fn is_any(&self) -> bool {
        self.clauses.iter().any(|clause| clause.is_empty())
    }

    /// Check if a version matches this spec
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses
            .iter()
            .any(|clause| clause.iter().all(|comp| comp.matches(version)))
    }

    /// Intersect two specs; fails with `Unsatisfiable` when no version can
    /// satisfy both.
    pub fn intersect(&self, other: &VersionSpec) -> DepsweepResult<VersionSpec> {
        let mut clauses: Vec<Vec<Comparator>> = Vec::new();
        for left in &self.clauses {
            for right in &other.clauses {
                let mut combined = left.clone();
                combined.extend(right.iter().filter(|c| !left.contains(c)).cloned());
                if clause_is_satisfiable(&combined) && !clauses.contains(&combined) {
                    clauses.push(combined);
                }
            }
        }

        if clauses.is_empty() {
            return Err(DepsweepError::Unsatisfiable {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        Ok(VersionSpec::collapse(clauses))
    }

    /// Check whether any version can satisfy both specs
    pub fn intersects(&self, other: &VersionSpec) -> bool {
        self.intersect(other).is_ok()
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = DepsweepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_default_spec(&value)
    }
}

impl From<VersionSpec> for String {
    fn from(spec: VersionSpec) -> Self {
        spec.to_string()
    }
}

impl Default for VersionSpec {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return write!(f, "*");
        }
        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                clause
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        write!(f, "{}", clauses.join(" || "))
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn version_strategy() -> impl Strategy<Value = Version> {
        (0u64..5, 0u64..5, 0u64..5).prop_map(|(a, b, c)| Version::new(a, b, c))
    }

    fn comparator_strategy() -> impl Strategy<Value = Comparator> {
        (
            prop_oneof![
                Just(Op::Eq),
                Just(Op::Ne),
                Just(Op::Gt),
                Just(Op::Ge),
                Just(Op::Lt),
                Just(Op::Le)
            ],
            version_strategy(),
        )
            .prop_map(|(op, version)| Comparator::new(op, version))
    }

    fn spec_strategy() -> impl Strategy<Value = VersionSpec> {
        prop::collection::vec(prop::collection::vec(comparator_strategy(), 0..3), 1..3)
            .prop_map(|clauses| VersionSpec { clauses })
    }

    proptest! {
        // A version matches the intersection exactly when it matches both sides
        #[test]
        fn intersection_is_sound(
            a in spec_strategy(),
            b in spec_strategy(),
            probe in version_strategy(),
        ) {
            let both = a.matches(&probe) && b.matches(&probe);
            match a.intersect(&b) {
                Ok(spec) => prop_assert_eq!(spec.matches(&probe), both),
                Err(_) => prop_assert!(!both, "{} matches {} and {} but they were declared disjoint", probe, a, b),
            }
        }

        #[test]
        fn intersection_is_commutative_on_membership(
            a in spec_strategy(),
            b in spec_strategy(),
            probe in version_strategy(),
        ) {
            let ab = a.intersect(&b).map(|s| s.matches(&probe)).unwrap_or(false);
            let ba = b.intersect(&a).map(|s| s.matches(&probe)).unwrap_or(false);
            prop_assert_eq!(ab, ba);
        }
    }
}
