//! Error types for the installer.

use std::io;
use std::path::PathBuf;

/// Result type for installer operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Errors that can occur while downloading, extracting or removing packages.
#[derive(Debug)]
pub enum InstallError {
    /// The HTTP client could not be built.
    HttpClient { reason: String },

    /// Transport-level failure fetching an archive.
    Network {
        identifier: String,
        url: String,
        reason: String,
    },

    /// The server answered with a non-success status.
    HttpStatus {
        identifier: String,
        url: String,
        status: u16,
    },

    /// A download exceeded its deadline.
    Timeout {
        identifier: String,
        url: String,
        timeout_secs: u64,
    },

    /// The downloaded archive does not match its published SHA-256.
    ChecksumMismatch {
        identifier: String,
        expected: String,
        actual: String,
    },

    /// The batch was cancelled.
    Cancelled,

    /// An archive entry would land outside the install root.
    PathContainmentViolation { identifier: String, entry: String },

    /// A filesystem operation failed.
    Filesystem { path: PathBuf, source: io::Error },

    /// An archive could not be read.
    InvalidArchive {
        identifier: String,
        path: PathBuf,
        reason: String,
    },

    /// The package has no install rule to place its files with.
    MissingInstallRule { identifier: String },

    /// The package was not part of the downloaded batch.
    NotDownloaded { identifier: String },

    /// A worker task died before reporting.
    TaskFailed { reason: String },

    /// One package failed and took the batch down with it.
    BatchFailed {
        identifier: String,
        source: Box<InstallError>,
    },
}

impl InstallError {
    /// Wrap a per-package error as the batch failure.
    pub fn batch(identifier: impl Into<String>, source: InstallError) -> Self {
        Self::BatchFailed {
            identifier: identifier.into(),
            source: Box::new(source),
        }
    }

    /// Build a filesystem error for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error (or the one it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::BatchFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpClient { reason } => write!(f, "failed to create HTTP client: {}", reason),
            Self::Network {
                identifier,
                url,
                reason,
            } => {
                write!(f, "failed to download {} from {}: {}", identifier, url, reason)
            }
            Self::HttpStatus {
                identifier,
                url,
                status,
            } => {
                write!(
                    f,
                    "failed to download {} from {}: HTTP {}",
                    identifier, url, status
                )
            }
            Self::Timeout {
                identifier,
                url,
                timeout_secs,
            } => {
                write!(
                    f,
                    "download of {} from {} timed out after {}s",
                    identifier, url, timeout_secs
                )
            }
            Self::ChecksumMismatch {
                identifier,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "checksum mismatch for {}: expected {}, got {}",
                    identifier, expected, actual
                )
            }
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::PathContainmentViolation { identifier, entry } => {
                write!(
                    f,
                    "archive entry {:?} of {} escapes the install root",
                    entry, identifier
                )
            }
            Self::Filesystem { path, source } => {
                write!(f, "filesystem error at {}: {}", path.display(), source)
            }
            Self::InvalidArchive {
                identifier,
                path,
                reason,
            } => {
                write!(
                    f,
                    "invalid archive for {} at {}: {}",
                    identifier,
                    path.display(),
                    reason
                )
            }
            Self::MissingInstallRule { identifier } => {
                write!(f, "{} has no install rule", identifier)
            }
            Self::NotDownloaded { identifier } => {
                write!(f, "{} was not downloaded in this batch", identifier)
            }
            Self::TaskFailed { reason } => write!(f, "worker task failed: {}", reason),
            Self::BatchFailed { identifier, source } => {
                write!(f, "batch failed at {}: {}", identifier, source)
            }
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filesystem { source, .. } => Some(source),
            Self::BatchFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_display() {
        let err = InstallError::ChecksumMismatch {
            identifier: "MechJeb2".to_string(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("def456"));
    }

    #[test]
    fn test_batch_failed_names_identifier() {
        let err = InstallError::batch(
            "Kopernicus",
            InstallError::HttpStatus {
                identifier: "Kopernicus".to_string(),
                url: "https://example.com/k.zip".to_string(),
                status: 404,
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("batch failed at Kopernicus"));
        assert!(msg.contains("HTTP 404"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(InstallError::Cancelled.is_cancelled());
        assert!(InstallError::batch("A", InstallError::Cancelled).is_cancelled());
        assert!(!InstallError::TaskFailed {
            reason: "panic".into()
        }
        .is_cancelled());
    }
}
