//! Semantic version parsing, validation and incrementing.
//!
//! Labels follow `MAJOR.MINOR.PATCH[-prerelease][+build]`. Parsing never
//! fails loudly: a label that does not match yields `None` and callers
//! decide what to do with free-form history.

use crate::Error;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z.-]+))?(?:\+([0-9A-Za-z.-]+))?$")
        .expect("semver pattern is valid")
});

// Dotted numeric labels with wildcard components, e.g. `1.2` or `1.2.x`.
static NEAR_SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.[0-9xX*]*)+$").expect("near-semver pattern is valid")
});

/// A parsed semantic version label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

impl SemanticVersion {
    /// Returns the label that follows this one for the given increment.
    ///
    /// Pre-release and build metadata are dropped from the result.
    #[must_use]
    pub fn bump(&self, kind: IncrementKind) -> Self {
        let (major, minor, patch) = match kind {
            IncrementKind::Major => (self.major.saturating_add(1), 0, 0),
            IncrementKind::Minor => (self.major, self.minor.saturating_add(1), 0),
            IncrementKind::Patch => (self.major, self.minor, self.patch.saturating_add(1)),
        };
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// Which component of a semantic version to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementKind {
    Major,
    Minor,
    Patch,
}

impl IncrementKind {
    pub const ALL: [IncrementKind; 3] = [Self::Major, Self::Minor, Self::Patch];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for IncrementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncrementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => Err(Error::UnknownIncrementKind(other.to_string())),
        }
    }
}

/// Parses a semantic version label, returning `None` on any mismatch.
///
/// Numeric components that overflow `u64` are treated as a mismatch.
pub fn parse_semantic_version(s: &str) -> Option<SemanticVersion> {
    let caps = SEMVER_RE.captures(s)?;
    Some(SemanticVersion {
        major: caps.get(1)?.as_str().parse().ok()?,
        minor: caps.get(2)?.as_str().parse().ok()?,
        patch: caps.get(3)?.as_str().parse().ok()?,
        prerelease: caps.get(4).map(|m| m.as_str().to_string()),
        build: caps.get(5).map(|m| m.as_str().to_string()),
    })
}

/// Returns true iff `s` parses as a semantic version.
pub fn is_valid_semantic_version(s: &str) -> bool {
    parse_semantic_version(s).is_some()
}

/// Returns true if `s` reads as an attempt at a semantic version but does not
/// parse as one, such as `1.2`, `1.2.x` or `1.2.3.4`.
///
/// Free-form labels like `spring-sale` are not malformed.
pub fn is_malformed_semantic_version(s: &str) -> bool {
    NEAR_SEMVER_RE.is_match(s) && !is_valid_semantic_version(s)
}

/// Increments `s` by `kind`, or returns `None` if `s` is not a semantic version.
pub fn increment_semantic_version(s: &str, kind: IncrementKind) -> Option<String> {
    parse_semantic_version(s).map(|v| v.bump(kind).to_string())
}
