//! Resolution errors.

use std::fmt;

use thiserror::Error;

/// Result type for queue and resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Where a conflicting package was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSide {
    /// Already installed and staying installed.
    Installed,
    /// Part of the same install batch.
    Batch,
}

impl fmt::Display for ConflictSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Batch => write!(f, "queued for install"),
        }
    }
}

/// Why a request could not be resolved.
///
/// A failed request leaves the queue exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The identifier is not in the registry.
    #[error("unknown package: {identifier}")]
    UnknownPackage { identifier: String },

    /// A declared dependency is not in the registry.
    #[error("{required_by} depends on {identifier}, which is not in the registry")]
    UnresolvedDependency {
        identifier: String,
        required_by: String,
    },

    /// Two packages that cannot coexist would end up installed together.
    #[error("{identifier} conflicts with {conflicting} ({side})")]
    ConflictDetected {
        identifier: String,
        conflicting: String,
        side: ConflictSide,
    },
}

impl ResolveError {
    /// The package identifier the error is about.
    pub fn identifier(&self) -> &str {
        match self {
            Self::UnknownPackage { identifier }
            | Self::UnresolvedDependency { identifier, .. }
            | Self::ConflictDetected { identifier, .. } => identifier,
        }
    }
}
