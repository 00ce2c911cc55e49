//! Core package record.
//!
//! The [`Package`] struct is one version of one mod, exactly as the registry
//! stores it. It is created by the descriptor normalizer and afterwards only
//! its state flags (`compatible`, `installed`, `downloaded`) change.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::install_rule::InstallRule;
use crate::version::{CompatibilityWindow, ParsedVersion, Version};

/// Descriptor field a normalization step is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The document as a whole (not JSON, not an object).
    Document,
    Name,
    Identifier,
    Author,
    Version,
    KspVersion,
    Abstract,
    Description,
    License,
    Install,
    Download,
    Depends,
    Conflicts,
    SearchSpace,
}

impl Field {
    /// Name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Name => "name",
            Self::Identifier => "identifier",
            Self::Author => "author",
            Self::Version => "version",
            Self::KspVersion => "ksp_version",
            Self::Abstract => "abstract",
            Self::Description => "description",
            Self::License => "license",
            Self::Install => "install",
            Self::Download => "download",
            Self::Depends => "depends",
            Self::Conflicts => "conflicts",
            Self::SearchSpace => "search_space",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Severity of a failed normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Malformed data; the package is counted as a failure.
    Error,
    /// Expected gap (no install stanza); the package is skipped silently.
    Ignorable,
}

/// Why a normalization step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Severity.
    pub kind: FieldErrorKind,
    /// Human-readable cause.
    pub message: String,
}

impl FieldError {
    /// A malformed-field error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Error,
            message: message.into(),
        }
    }

    /// An ignorable gap.
    pub fn ignorable(message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Ignorable,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Where to fetch a package archive from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    /// Archive URL.
    pub url: String,
    /// Expected SHA-256 of the archive (lowercase hex), when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Archive size in bytes, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One version of one mod.
///
/// # Example
///
/// ```
/// use kspmod::package::Package;
///
/// let package = Package::new("MechJeb2");
/// assert_eq!(package.identifier, "MechJeb2");
/// assert!(!package.installed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Stable identifier, unique per mod across versions.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Authors, in descriptor order.
    pub authors: Vec<String>,
    /// One-line summary.
    #[serde(rename = "abstract")]
    pub summary: String,
    /// Optional long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Licenses, in descriptor order.
    pub licenses: Vec<String>,
    /// The package's own version.
    pub version: ParsedVersion,
    /// Supported game versions.
    pub window: CompatibilityWindow,
    /// Install stanza; absent only for packages that never reach the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallRule>,
    /// Archive location.
    pub download: Download,
    /// Identifiers this package requires.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Identifiers this package cannot coexist with.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Whether the window contains the installed game version.
    #[serde(default)]
    pub compatible: bool,
    /// Whether the package's artifact was found on disk.
    #[serde(default)]
    pub installed: bool,
    /// Whether the archive has been fetched in the current apply cycle.
    #[serde(default)]
    pub downloaded: bool,
    /// Lower-cased letters-and-spaces text used by search.
    #[serde(default)]
    pub search_space: String,
    /// Whether every normalization step succeeded.
    pub valid: bool,
    /// Failed normalization steps.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<Field, FieldError>,
}

impl Package {
    /// Create an empty, not yet valid package with the given identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    /// The ordered own version (epoch excluded).
    pub fn own_version(&self) -> &Version {
        &self.version.version
    }

    /// Whether any failed step was a real error (not merely ignorable).
    pub fn is_malformed(&self) -> bool {
        self.errors
            .values()
            .any(|e| e.kind == FieldErrorKind::Error)
    }

    /// Whether the package is invalid only because of ignorable gaps.
    pub fn is_ignorable(&self) -> bool {
        !self.errors.is_empty() && !self.is_malformed()
    }

    /// Re-derive `compatible` for a game version.
    pub fn refresh_compatibility(&mut self, game: &Version) {
        self.compatible = self.window.is_compatible(game);
    }

    /// Whether this package declares a conflict with `identifier`.
    pub fn conflicts_with(&self, identifier: &str) -> bool {
        self.conflicts.iter().any(|c| c == identifier)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.identifier, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    fn test_package() -> Package {
        let mut package = Package::new("MechJeb2");
        package.name = "MechJeb 2".to_string();
        package.version = parse_version("2:2.14.3").unwrap();
        package.window = CompatibilityWindow::new(
            parse_version("1.8").unwrap().version,
            parse_version("1.12").unwrap().version,
        );
        package.valid = true;
        package
    }

    #[test]
    fn test_package_display() {
        assert_eq!(test_package().to_string(), "MechJeb2 v2:2.14.3");
    }

    #[test]
    fn test_refresh_compatibility() {
        let mut package = test_package();
        package.refresh_compatibility(&"1.10".parse().unwrap());
        assert!(package.compatible);
        package.refresh_compatibility(&"1.7".parse().unwrap());
        assert!(!package.compatible);
    }

    #[test]
    fn test_error_classification() {
        let mut package = test_package();
        assert!(!package.is_malformed());
        assert!(!package.is_ignorable());

        package
            .errors
            .insert(Field::Install, FieldError::ignorable("no install stanza"));
        assert!(package.is_ignorable());

        package
            .errors
            .insert(Field::Download, FieldError::error("empty download URL"));
        assert!(package.is_malformed());
        assert!(!package.is_ignorable());
    }

    #[test]
    fn test_json_round_trip_keeps_abstract_key() {
        let mut package = test_package();
        package.summary = "Autopilot".to_string();
        let json = serde_json::to_value(&package).unwrap();
        assert_eq!(json["abstract"], "Autopilot");
        let back: Package = serde_json::from_value(json).unwrap();
        assert_eq!(back, package);
    }
}
