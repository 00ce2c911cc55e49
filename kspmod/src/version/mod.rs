//! Version parsing, ordering and compatibility windows.
//!
//! Mod descriptors carry versions in every shape imaginable: plain
//! `1.2.3`, epoch-prefixed `2:1.0`, `v`-prefixed tags and free text such
//! as `v1.2.3-beta [KSP 1.8]`. This module turns them into a [`Version`]
//! that orders numerically, segment by segment.
//!
//! # Parsing
//!
//! [`parse_version`] works in three steps:
//!
//! 1. Split off the epoch (everything before the first `:`)
//! 2. Try a direct parse of the remainder
//! 3. On failure, extract the first run of dot-separated digit groups,
//!    strip brackets and parse again
//!
//! # Example
//!
//! ```
//! use kspmod::version::parse_version;
//!
//! let parsed = parse_version("2:1.0").unwrap();
//! assert_eq!(parsed.epoch, "2");
//! assert_eq!(parsed.version.to_string(), "1.0");
//! ```

mod window;

pub use window::{resolve_compatibility_window, CompatibilityWindow};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use semver::Prerelease;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Errors produced by the version engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Neither the direct parse nor the digit-group fallback produced a version.
    #[error("cannot parse version {raw:?}")]
    Parse { raw: String },

    /// A descriptor declares no game version information at all.
    #[error("no game version information (ksp_version, ksp_version_min or ksp_version_max)")]
    MissingVersionInfo,
}

fn direct_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[vV]?(\d+(?:\.\d+)*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
        )
        .expect("direct version pattern is valid")
    })
}

fn fallback_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+(\.\d+)+").expect("fallback version pattern is valid"))
}

/// A numerically ordered version.
///
/// Trailing zero segments are insignificant for ordering and equality, so
/// `1.8` and `1.8.0` compare equal. A pre-release tag orders before the
/// plain release; build metadata is kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    segments: Vec<u64>,
    pre: Prerelease,
    build: String,
}

impl Version {
    /// Create a release version from numeric segments.
    pub fn new(segments: impl Into<Vec<u64>>) -> Self {
        let mut segments = segments.into();
        if segments.is_empty() {
            segments.push(0);
        }
        Self {
            segments,
            pre: Prerelease::EMPTY,
            build: String::new(),
        }
    }

    /// The `0.0` version used as the open lower bound of a window.
    pub fn zero() -> Self {
        Self::new(vec![0, 0])
    }

    /// Parse a version without epoch handling or fallback extraction.
    pub fn parse_strict(raw: &str) -> VersionResult<Self> {
        let raw = raw.trim();
        let caps = direct_pattern()
            .captures(raw)
            .ok_or_else(|| VersionError::Parse {
                raw: raw.to_string(),
            })?;

        let mut segments = Vec::new();
        for part in caps[1].split('.') {
            let value = part.parse::<u64>().map_err(|_| VersionError::Parse {
                raw: raw.to_string(),
            })?;
            segments.push(value);
        }

        let pre = match caps.get(2) {
            Some(m) => Prerelease::new(m.as_str()).map_err(|_| VersionError::Parse {
                raw: raw.to_string(),
            })?,
            None => Prerelease::EMPTY,
        };

        let build = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Ok(Self {
            segments,
            pre,
            build,
        })
    }

    /// Numeric segments as parsed.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Pre-release tag, empty for releases.
    pub fn pre(&self) -> &str {
        self.pre.as_str()
    }

    /// Whether this version carries a pre-release tag.
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.pre.cmp(&other.pre)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", joined.join("."))?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version(s).map(|parsed| parsed.version)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse_strict(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// A parsed version together with its epoch prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedVersion {
    /// The ordered version.
    pub version: Version,
    /// Epoch prefix, empty when the raw string had none.
    pub epoch: String,
}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}:{}", self.epoch, self.version)
        }
    }
}

/// Parse a raw version string, with epoch split and best-effort fallback.
///
/// # Example
///
/// ```
/// use kspmod::version::parse_version;
///
/// let parsed = parse_version("v1.2.3-beta [KSP 1.8]").unwrap();
/// assert_eq!(parsed.version.to_string(), "1.2.3");
/// assert_eq!(parsed.epoch, "");
/// ```
pub fn parse_version(raw: &str) -> VersionResult<ParsedVersion> {
    let raw = raw.trim();
    let (epoch, rest) = match raw.split_once(':') {
        Some((epoch, rest)) => (epoch.trim().to_string(), rest.trim()),
        None => (String::new(), raw),
    };

    if let Ok(version) = Version::parse_strict(rest) {
        return Ok(ParsedVersion { version, epoch });
    }

    let extracted = fallback_pattern()
        .find(rest)
        .map(|m| m.as_str().replace(['[', ']', '(', ')', '{', '}'], ""))
        .ok_or_else(|| VersionError::Parse {
            raw: raw.to_string(),
        })?;

    let version = Version::parse_strict(&extracted).map_err(|_| VersionError::Parse {
        raw: raw.to_string(),
    })?;

    Ok(ParsedVersion { version, epoch })
}

/// Compare two versions numerically.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap().version
    }

    #[test]
    fn test_parse_plain_version() {
        let parsed = parse_version("1.2.3").unwrap();
        assert_eq!(parsed.version, Version::new(vec![1, 2, 3]));
        assert_eq!(parsed.epoch, "");
    }

    #[test]
    fn test_parse_epoch_version() {
        let parsed = parse_version("2:1.0").unwrap();
        assert_eq!(parsed.version.to_string(), "1.0");
        assert_eq!(parsed.epoch, "2");
        assert_eq!(parsed.to_string(), "2:1.0");
    }

    #[test]
    fn test_parse_falls_back_to_first_digit_run() {
        let parsed = parse_version("v1.2.3-beta [KSP 1.8]").unwrap();
        assert_eq!(parsed.version.to_string(), "1.2.3");
        assert!(!parsed.version.is_prerelease());
    }

    #[test]
    fn test_parse_prefixed_and_prerelease() {
        assert_eq!(v("v1.4").to_string(), "1.4");
        let pre = v("1.2.3-beta.2");
        assert_eq!(pre.pre(), "beta.2");
        assert!(pre < v("1.2.3"));
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = parse_version("release candidate").unwrap_err();
        assert!(matches!(err, VersionError::Parse { .. }));
        assert!(parse_version("").is_err());
    }

    #[test]
    fn test_trailing_zero_segments_are_equal() {
        assert_eq!(v("1.8"), v("1.8.0"));
        assert_eq!(compare(&v("1.8"), &v("1.8.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.12.3") > v("1.12"));
        assert!(v("0.0") < v("0.1"));
    }

    #[test]
    fn test_serde_round_trips_through_string() {
        let json = serde_json::to_string(&v("1.2.3")).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2.3"));
    }

    proptest! {
        #[test]
        fn prop_appending_zero_preserves_order(segs in proptest::collection::vec(0u64..1000, 1..5)) {
            let a = Version::new(segs.clone());
            let mut padded = segs;
            padded.push(0);
            prop_assert_eq!(a.cmp(&Version::new(padded)), Ordering::Equal);
        }

        #[test]
        fn prop_ordering_is_antisymmetric(
            a in proptest::collection::vec(0u64..50, 1..4),
            b in proptest::collection::vec(0u64..50, 1..4),
        ) {
            let va = Version::new(a);
            let vb = Version::new(b);
            prop_assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
        }

        #[test]
        fn prop_display_parses_back(segs in proptest::collection::vec(0u64..100_000, 1..5)) {
            let original = Version::new(segs);
            let reparsed = Version::parse_strict(&original.to_string()).unwrap();
            prop_assert_eq!(original, reparsed);
        }
    }
}
