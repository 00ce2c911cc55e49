//! Settings structs.
//!
//! [`ConfigFile`] mirrors the INI file one struct per `[section]`.
//! [`Settings`] is the flat, validated value handed to component
//! constructors.

use std::path::PathBuf;
use std::time::Duration;

use crate::installer::InstallerConfig;
use crate::registry::{IndexOptions, SortField, SortOrder};
use crate::version::Version;

/// Complete configuration as loaded from `config.ini`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// `[game]`
    pub game: GameSettings,
    /// `[metadata]`
    pub metadata: MetadataSettings,
    /// `[registry]`
    pub registry: RegistrySettings,
    /// `[install]`
    pub install: InstallSettings,
    /// `[network]`
    pub network: NetworkSettings,
    /// `[logging]`
    pub logging: LoggingSettings,
    /// File this configuration was loaded from.
    pub(super) source: Option<PathBuf>,
}

/// Game installation.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Game install root (the directory containing `GameData`).
    pub install_root: Option<PathBuf>,
    /// Installed game version, as written in the file.
    pub version: String,
}

/// Remote metadata repository.
#[derive(Debug, Clone)]
pub struct MetadataSettings {
    pub repo_url: String,
    pub branch: String,
    /// Head commit of the last successful ingestion.
    pub last_known_commit_hash: Option<String>,
    /// Threads used to parse descriptors.
    pub parse_workers: usize,
}

/// Registry store and index presentation.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub store_path: PathBuf,
    pub hide_incompatible: bool,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

/// Installer.
#[derive(Debug, Clone)]
pub struct InstallSettings {
    pub staging_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    pub verify_checksums: bool,
}

/// Network deadlines.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    /// Timeout in seconds for git and HTTP operations.
    pub timeout: u64,
}

/// Logging.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Level filter used when `RUST_LOG` is not set.
    pub level: String,
    /// Directory for the rolling log file; console only when unset.
    pub directory: Option<PathBuf>,
}

/// Runtime settings passed explicitly into each component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub install_root: PathBuf,
    pub game_version: Version,
    pub metadata_repo_url: String,
    pub metadata_branch: String,
    pub last_known_commit_hash: Option<String>,
    pub hide_incompatible: bool,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub store_path: PathBuf,
    pub staging_dir: PathBuf,
    pub network_timeout_secs: u64,
    pub max_concurrent_downloads: usize,
    pub max_parse_workers: usize,
    pub verify_checksums: bool,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Settings for `install_root` with every other value at its default.
    pub fn new(install_root: PathBuf, game_version: Version) -> Self {
        let defaults = ConfigFile::default();
        Self {
            install_root,
            game_version,
            metadata_repo_url: defaults.metadata.repo_url,
            metadata_branch: defaults.metadata.branch,
            last_known_commit_hash: None,
            hide_incompatible: defaults.registry.hide_incompatible,
            sort_field: defaults.registry.sort_field,
            sort_order: defaults.registry.sort_order,
            store_path: defaults.registry.store_path,
            staging_dir: defaults.install.staging_dir,
            network_timeout_secs: defaults.network.timeout,
            max_concurrent_downloads: defaults.install.max_concurrent_downloads,
            max_parse_workers: defaults.metadata.parse_workers,
            verify_checksums: defaults.install.verify_checksums,
            log_level: defaults.logging.level,
            log_dir: None,
        }
    }

    pub fn with_metadata_repo(mut self, url: impl Into<String>, branch: impl Into<String>) -> Self {
        self.metadata_repo_url = url.into();
        self.metadata_branch = branch.into();
        self
    }

    pub fn with_last_known_commit_hash(mut self, hash: Option<String>) -> Self {
        self.last_known_commit_hash = hash;
        self
    }

    pub fn with_hide_incompatible(mut self, hide: bool) -> Self {
        self.hide_incompatible = hide;
        self
    }

    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    pub fn with_store_path(mut self, path: PathBuf) -> Self {
        self.store_path = path;
        self
    }

    pub fn with_staging_dir(mut self, path: PathBuf) -> Self {
        self.staging_dir = path;
        self
    }

    pub fn with_network_timeout_secs(mut self, secs: u64) -> Self {
        self.network_timeout_secs = secs.max(1);
        self
    }

    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    pub fn with_max_parse_workers(mut self, workers: usize) -> Self {
        self.max_parse_workers = workers.max(1);
        self
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Network deadline as a `Duration`.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Installer configuration derived from these settings.
    pub fn installer_config(&self) -> InstallerConfig {
        InstallerConfig::new(self.install_root.clone())
            .with_staging_dir(self.staging_dir.clone())
            .with_timeout(self.network_timeout())
            .with_max_concurrent_downloads(self.max_concurrent_downloads)
            .with_verify_checksums(self.verify_checksums)
    }

    /// Index options derived from these settings.
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions::default()
            .with_sort(self.sort_field, self.sort_order)
            .with_hide_incompatible(self.hide_incompatible)
    }
}
