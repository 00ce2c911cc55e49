//! Configuration for the installer.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the installer.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Game install root. Nothing is ever written outside it.
    pub install_root: PathBuf,

    /// Parent directory for per-batch staging directories.
    pub staging_dir: PathBuf,

    /// Deadline for each HTTP request, body included.
    pub timeout: Duration,

    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,

    /// Whether to verify published SHA-256 checksums.
    pub verify_checksums: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("."),
            staging_dir: std::env::temp_dir().join("kspmod-staging"),
            timeout: Duration::from_secs(60),
            max_concurrent_downloads: 4,
            verify_checksums: true,
        }
    }
}

impl InstallerConfig {
    /// Create a new configuration with the given install root.
    pub fn new(install_root: PathBuf) -> Self {
        Self {
            install_root,
            ..Default::default()
        }
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: PathBuf) -> Self {
        self.staging_dir = path;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum concurrent downloads.
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    /// Enable or disable checksum verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstallerConfig::default();
        assert_eq!(config.max_concurrent_downloads, 4);
        assert!(config.verify_checksums);
        assert!(config.staging_dir.ends_with("kspmod-staging"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = InstallerConfig::new(PathBuf::from("/games/KSP"))
            .with_staging_dir(PathBuf::from("/tmp/stage"))
            .with_timeout(Duration::from_secs(10))
            .with_max_concurrent_downloads(0)
            .with_verify_checksums(false);

        assert_eq!(config.install_root, PathBuf::from("/games/KSP"));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/stage"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_concurrent_downloads, 1);
        assert!(!config.verify_checksums);
    }
}
