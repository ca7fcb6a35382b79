//! Per-ecosystem parsing rules.
//!
//! Every ecosystem resolver exposes a [`VersionScheme`]; the resolution
//! engine only ever talks to versions and specs through it. The default
//! grammar accepts the union of the common range dialects:
//!
//! | Input            | Meaning                          |
//! |------------------|----------------------------------|
//! | `*`, `x`, empty  | any version                      |
//! | `1.2.3`, `=1.2.3`, `==1.2.3` | exactly `1.2.3`      |
//! | `!=1.2.3`        | anything but `1.2.3`             |
//! | `>1`, `>=1`, `<2`, `<=2` | comparisons              |
//! | `^1.2.3`         | `>=1.2.3,<2`                     |
//! | `~1.2.3`         | `>=1.2.3,<1.3`                   |
//! | `~=1.4.2`        | `>=1.4.2,<1.5`                   |
//! | `1.2.*`, `1.x`   | prefix ranges                    |
//! | `a, b` / `a b`   | conjunction                      |
//! | `a \|\| b`       | disjunction                      |

use super::{Comparator, Op, Version, VersionSpec};
use crate::error::{DepsweepError, DepsweepResult};

/// Parsing and normalization rules of one ecosystem
pub trait VersionScheme: Send + Sync {
    /// Parse a concrete version string
    fn parse_version(&self, input: &str) -> DepsweepResult<Version> {
        Version::parse(input)
    }

    /// Parse a version constraint string
    fn parse_spec(&self, input: &str) -> DepsweepResult<VersionSpec> {
        parse_default_spec(input)
    }

    /// Normalize a package name so equal packages compare equal
    fn normalize_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Scheme used by ecosystems without stricter rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScheme;

impl VersionScheme for DefaultScheme {}

const OPERATORS: [(&str, Operator); 11] = [
    ("===", Operator::Exact),
    ("==", Operator::Exact),
    ("!=", Operator::NotEqual),
    (">=", Operator::Cmp(Op::Ge)),
    ("<=", Operator::Cmp(Op::Le)),
    ("~=", Operator::Compatible),
    (">", Operator::Cmp(Op::Gt)),
    ("<", Operator::Cmp(Op::Lt)),
    ("^", Operator::Caret),
    ("~", Operator::Tilde),
    ("=", Operator::Exact),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Exact,
    NotEqual,
    Cmp(Op),
    Caret,
    Tilde,
    Compatible,
}

/// Version text with an optional trailing wildcard (`1.2.*`)
enum Target {
    Full(Version),
    Prefix(Vec<u64>),
}

/// Parse a spec with the default grammar
pub fn parse_default_spec(input: &str) -> DepsweepResult<VersionSpec> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(VersionSpec::any());
    }

    let mut clauses = Vec::new();
    for clause in trimmed.split("||") {
        let clause = clause.trim();
        if clause.is_empty() {
            return Err(DepsweepError::invalid_spec(input, "empty alternative"));
        }
        clauses.push(parse_clause(input, clause)?);
    }

    VersionSpec::from_clauses(clauses).map_err(|_| {
        DepsweepError::invalid_spec(input, "no version can satisfy this specification")
    })
}

fn parse_clause(input: &str, clause: &str) -> DepsweepResult<Vec<Comparator>> {
    let mut comparators = Vec::new();
    for piece in clause.split(',') {
        let mut pending_op: Option<&str> = None;
        let mut saw_term = false;
        for token in piece.split_whitespace() {
            let term = match pending_op.take() {
                Some(op) => format!("{}{}", op, token),
                None if OPERATORS.iter().any(|(sym, _)| *sym == token) => {
                    pending_op = Some(token);
                    continue;
                },
                None => token.to_string(),
            };
            comparators.extend(parse_term(input, &term)?);
            saw_term = true;
        }
        if pending_op.is_some() {
            return Err(DepsweepError::invalid_spec(input, "operator without a version"));
        }
        if !saw_term {
            return Err(DepsweepError::invalid_spec(input, "empty constraint"));
        }
    }
    Ok(comparators)
}

fn parse_term(input: &str, term: &str) -> DepsweepResult<Vec<Comparator>> {
    let (operator, rest) = OPERATORS
        .iter()
        .find_map(|(sym, op)| term.strip_prefix(sym).map(|rest| (Some(*op), rest)))
        .unwrap_or((None, term));

    let target = parse_target(input, rest.trim())?;
    let ge = |v: Version| Comparator::new(Op::Ge, v);
    let lt = |v: Version| Comparator::new(Op::Lt, v);
    let bump = |v: &Version, index: usize| {
        v.bump(index)
            .map_err(|_| DepsweepError::invalid_spec(input, format!("'{}' has no representable upper bound", term)))
    };

    let comparators = match (operator, target) {
        // Wildcards
        (_, Target::Prefix(prefix)) if prefix.is_empty() => match operator {
            None | Some(Operator::Exact) | Some(Operator::Cmp(Op::Ge)) | Some(Operator::Cmp(Op::Le)) => Vec::new(),
            _ => return Err(DepsweepError::invalid_spec(input, format!("'{}' excludes every version", term))),
        },
        (op, Target::Prefix(prefix)) => {
            let base = Version::from_release(prefix.clone());
            let next = || bump(&base, prefix.len() - 1);
            match op {
                None | Some(Operator::Exact) | Some(Operator::Caret) | Some(Operator::Tilde) | Some(Operator::Compatible) => {
                    let upper = next()?;
                    vec![ge(base), lt(upper)]
                },
                Some(Operator::Cmp(Op::Ge)) => vec![ge(base)],
                Some(Operator::Cmp(Op::Gt)) => vec![ge(next()?)],
                Some(Operator::Cmp(Op::Lt)) => vec![lt(base)],
                Some(Operator::Cmp(Op::Le)) => vec![lt(next()?)],
                Some(Operator::NotEqual) | Some(Operator::Cmp(_)) => {
                    return Err(DepsweepError::invalid_spec(
                        input,
                        format!("'{}' cannot be combined with a wildcard", term),
                    ))
                },
            }
        },
        (None, Target::Full(v)) | (Some(Operator::Exact), Target::Full(v)) => {
            vec![Comparator::new(Op::Eq, v)]
        },
        (Some(Operator::NotEqual), Target::Full(v)) => vec![Comparator::new(Op::Ne, v)],
        (Some(Operator::Cmp(op)), Target::Full(v)) => vec![Comparator::new(op, v)],
        (Some(Operator::Caret), Target::Full(v)) => {
            let len = v.release.len();
            let first_nonzero = v.release.iter().position(|c| *c != 0).unwrap_or(len - 1);
            let upper = bump(&v, first_nonzero)?;
            vec![ge(v), lt(upper)]
        },
        (Some(Operator::Tilde), Target::Full(v)) => {
            let upper = bump(&v, if v.release.len() >= 2 { 1 } else { 0 })?;
            vec![ge(v), lt(upper)]
        },
        (Some(Operator::Compatible), Target::Full(v)) => {
            if v.release.len() < 2 {
                return Err(DepsweepError::invalid_spec(
                    input,
                    "'~=' needs at least two release components",
                ));
            }
            let upper = bump(&v, v.release.len() - 2)?;
            vec![ge(v), lt(upper)]
        },
    };
    Ok(comparators)
}

fn parse_target(input: &str, text: &str) -> DepsweepResult<Target> {
    if text.is_empty() {
        return Err(DepsweepError::invalid_spec(input, "operator without a version"));
    }

    let parts: Vec<&str> = text.split('.').collect();
    let wildcard = parts.iter().position(|p| matches!(*p, "*" | "x" | "X"));
    match wildcard {
        Some(index) => {
            if parts[index + 1..].iter().any(|p| !matches!(*p, "*" | "x" | "X")) {
                return Err(DepsweepError::invalid_spec(
                    input,
                    format!("wildcard must be trailing in '{}'", text),
                ));
            }
            let prefix = parts[..index]
                .iter()
                .map(|p| {
                    p.parse::<u64>().map_err(|_| {
                        DepsweepError::invalid_spec(input, format!("invalid component '{}'", p))
                    })
                })
                .collect::<DepsweepResult<Vec<u64>>>()?;
            Ok(Target::Prefix(prefix))
        },
        None => Version::parse(text)
            .map(Target::Full)
            .map_err(|e| DepsweepError::invalid_spec(input, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn spec(s: &str) -> VersionSpec {
        DefaultScheme.parse_spec(s).unwrap()
    }

    #[test]
    fn test_wildcards() {
        for input in ["*", "", "x", ">=*"] {
            assert!(spec(input).is_any(), "{} should match anything", input);
        }
        let minor = spec("1.2.*");
        assert!(minor.matches(&v("1.2.0")));
        assert!(minor.matches(&v("1.2.99")));
        assert!(!minor.matches(&v("1.3.0")));
        assert!(spec("1.x").matches(&v("1.9.9")));
        assert!(!spec("1.x").matches(&v("2.0.0")));
    }

    #[test]
    fn test_version_req_exact() {
        let req = spec("1.2.3");
        assert!(req.matches(&v("1.2.3")));
        assert!(!req.matches(&v("1.2.4")));
        assert!(spec("==1.2").matches(&v("1.2.0")));
        assert!(spec("=1.2.3").matches(&v("1.2.3+meta")));
    }

    #[test]
    fn test_version_req_caret() {
        let req = spec("^1.2.3");
        assert!(req.matches(&v("1.2.3")));
        assert!(req.matches(&v("1.3.0")));
        assert!(!req.matches(&v("2.0.0")));
        assert!(!req.matches(&v("1.2.2")));

        assert!(spec("^0.2.3").matches(&v("0.2.9")));
        assert!(!spec("^0.2.3").matches(&v("0.3.0")));
        assert!(!spec("^0.0.3").matches(&v("0.0.4")));
        assert!(spec("^0").matches(&v("0.9.0")));
    }

    #[test]
    fn test_version_req_tilde_and_compatible() {
        assert!(spec("~1.2.3").matches(&v("1.2.9")));
        assert!(!spec("~1.2.3").matches(&v("1.3.0")));
        assert!(spec("~1").matches(&v("1.9.0")));

        assert!(spec("~=1.4.2").matches(&v("1.4.9")));
        assert!(!spec("~=1.4.2").matches(&v("1.5.0")));
        assert!(spec("~=1.4").matches(&v("1.9")));
        assert!(!spec("~=1.4").matches(&v("2.0")));
    }

    #[test]
    fn test_version_req_operators() {
        let req = spec(">1.2.3");
        assert!(!req.matches(&v("1.2.3")));
        assert!(req.matches(&v("1.2.4")));

        let req = spec("<1.2.4");
        assert!(req.matches(&v("1.2.3")));
        assert!(!req.matches(&v("1.2.4")));

        assert!(!spec("!=1.0").matches(&v("1.0.0")));
        assert!(spec("!=1.0").matches(&v("1.0.1")));
    }

    #[test]
    fn test_conjunction_forms() {
        for input in [">=1.0, <2.0", ">=1.0 <2.0", ">= 1.0, < 2.0"] {
            let req = spec(input);
            assert!(req.matches(&v("1.5.0")), "{}", input);
            assert!(!req.matches(&v("2.0.0")), "{}", input);
        }
    }

    #[test]
    fn test_disjunction() {
        let req = spec("^1.0 || ^3.0");
        assert!(req.matches(&v("1.4.0")));
        assert!(req.matches(&v("3.1.0")));
        assert!(!req.matches(&v("2.0.0")));
        assert_eq!(req.clauses().len(), 2);
    }

    #[test]
    fn test_invalid_specs() {
        for input in [
            ">=",
            "^abc",
            "1.*.2",
            "~=1",
            "||",
            ">=1.0 ||",
            ">=2, <1",
            "!=1.*",
            "^18446744073709551615",
            "~0.18446744073709551615",
            "~=1.18446744073709551615.0",
            "1.18446744073709551615.*",
        ] {
            let err = DefaultScheme.parse_spec(input).unwrap_err();
            assert!(
                matches!(err, DepsweepError::InvalidSpecification { .. }),
                "{} should be rejected, got {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_largest_component_without_upper_bound() {
        let req = spec(">=18446744073709551615");
        assert!(req.matches(&Version::from_release(vec![u64::MAX])));
        assert!(spec("==18446744073709551615").matches(&Version::from_release(vec![u64::MAX, 0])));
        assert!(spec(">=1.18446744073709551615.*").matches(&Version::from_release(vec![2])));
    }

    #[test]
    fn test_default_name_normalization_is_identity() {
        assert_eq!(DefaultScheme.normalize_name("Foo_Bar"), "Foo_Bar");
    }
}
