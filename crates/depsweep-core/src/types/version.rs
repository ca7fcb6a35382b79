//! Concrete version type with a permissive, semver-like total order.
//!
//! Ecosystems with stricter rules map their own syntax onto this shape
//! through a [`VersionScheme`](super::VersionScheme); everything else falls
//! back to the ordering implemented here:
//!
//! - release components compare numerically, missing trailing components
//!   count as zero (`1.2 == 1.2.0`)
//! - a prerelease sorts before the plain release (`1.0.0-rc.1 < 1.0.0`)
//! - build metadata never takes part in equality, hashing or ordering

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{DepsweepError, DepsweepResult};

/// Concrete version (release[-prerelease][+build])
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub release: Vec<u64>,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

impl Version {
    /// Create a new three-component version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self::from_release(vec![major, minor, patch])
    }

    /// Create a version from raw release components
    pub fn from_release(release: Vec<u64>) -> Self {
        Self {
            release,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string
    pub fn parse(input: &str) -> DepsweepResult<Self> {
        input.parse()
    }

    /// Release component at `index`, zero when absent
    pub fn component(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    pub fn major(&self) -> u64 {
        self.component(0)
    }

    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    pub fn patch(&self) -> u64 {
        self.component(2)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Smallest release strictly above every version sharing the first
    /// `index + 1` components: `1.2.3` bumped at 1 is `1.3`.
    ///
    /// Fails when the bumped component is already `u64::MAX`.
    pub fn bump(&self, index: usize) -> DepsweepResult<Self> {
        let mut release: Vec<u64> = (0..=index).map(|i| self.component(i)).collect();
        release[index] = release[index]
            .checked_add(1)
            .ok_or_else(|| DepsweepError::invalid_spec(self.to_string(), "no release above this version"))?;
        Ok(Self::from_release(release))
    }

    /// The same version without prerelease or build metadata
    pub fn release_only(&self) -> Self {
        Self::from_release(self.release.clone())
    }

    /// Equality-preserving text form: trailing zero components and build
    /// metadata dropped (`1.2.0+abc` is `1.2`)
    pub fn canonical(&self) -> String {
        let release = self.significant_release();
        let mut text = if release.is_empty() {
            "0".to_string()
        } else {
            release.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(".")
        };
        if let Some(ref pre) = self.prerelease {
            let identifiers: Vec<String> = identifiers(pre).map(|id| id.to_string()).collect();
            text.push('-');
            text.push_str(&identifiers.join("."));
        }
        text
    }

    /// Release components with trailing zeros removed
    fn significant_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.release[..len]
    }

    fn release_cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// One dot-separated prerelease identifier. Numeric identifiers compare by
/// value, so `01` and `1` are the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Identifier<'a> {
    Numeric(u64),
    Alphanumeric(&'a str),
}

impl fmt::Display for Identifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::Alphanumeric(s) => f.write_str(s),
        }
    }
}

fn identifiers(prerelease: &str) -> impl Iterator<Item = Identifier<'_>> {
    prerelease.split('.').map(|part| match part.parse::<u64>() {
        Ok(n) => Identifier::Numeric(n),
        Err(_) => Identifier::Alphanumeric(part),
    })
}

/// Compare prerelease identifiers in order; numeric ones sort before
/// alphanumeric ones and a shorter list sorts first.
fn prerelease_cmp(a: &str, b: &str) -> Ordering {
    identifiers(a).cmp(identifiers(b))
}

impl FromStr for Version {
    type Err = DepsweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let stripped = match input.strip_prefix(['v', 'V']) {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
            _ => input,
        };

        if stripped.is_empty() {
            return Err(DepsweepError::invalid_spec(s, "empty version"));
        }

        // Split on '+' for build metadata
        let (version_part, build) = match stripped.split_once('+') {
            Some((_, "")) => return Err(DepsweepError::invalid_spec(s, "empty build metadata")),
            Some((v, b)) => (v, Some(b.to_string())),
            None => (stripped, None),
        };

        // Split on '-' for prerelease
        let (core_part, mut prerelease) = match version_part.split_once('-') {
            Some((_, "")) => return Err(DepsweepError::invalid_spec(s, "empty prerelease")),
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        let mut release = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let digits = part.find(|c: char| !c.is_ascii_digit()).unwrap_or(part.len());
            if digits == 0 {
                return Err(DepsweepError::invalid_spec(
                    s,
                    format!("invalid release component '{}'", part),
                ));
            }
            let value = part[..digits].parse::<u64>().map_err(|_| {
                DepsweepError::invalid_spec(s, format!("release component '{}' overflows", part))
            })?;
            release.push(value);

            // Attached prerelease tags like `1.0rc1` are only allowed on the last component
            if digits < part.len() {
                if i + 1 != parts.len() || prerelease.is_some() {
                    return Err(DepsweepError::invalid_spec(
                        s,
                        format!("invalid release component '{}'", part),
                    ));
                }
                prerelease = Some(part[digits..].to_string());
            }
        }

        Ok(Version {
            release,
            prerelease,
            build,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = DepsweepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", release.join("."))?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_release().hash(state);
        match &self.prerelease {
            Some(pre) => {
                state.write_u8(1);
                for identifier in identifiers(pre) {
                    identifier.hash(state);
                }
            },
            None => state.write_u8(0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.release_cmp(other) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => prerelease_cmp(a, b),
            },
            other => other,
        }
    }
}
