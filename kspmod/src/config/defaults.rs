//! Default values for every configuration setting.

use std::path::PathBuf;

use super::settings::*;
use crate::registry::{SortField, SortOrder};

/// Default metadata repository.
pub const DEFAULT_METADATA_REPO_URL: &str = "https://github.com/KSP-CKAN/CKAN-meta.git";

/// Default metadata branch.
pub const DEFAULT_METADATA_BRANCH: &str = "master";

/// Default game version assumed when none is configured.
pub const DEFAULT_GAME_VERSION: &str = "1.12.5";

/// Default network timeout in seconds (git and HTTP).
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 120;

/// Default number of concurrent archive downloads.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Default number of descriptor parse workers.
pub const DEFAULT_MAX_PARSE_WORKERS: usize = 4;

/// Default log level filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the application directory below the platform config/data dirs.
pub const APP_DIR_NAME: &str = "kspmod";

/// Default registry store location (`<data dir>/kspmod/registry.sqlite`).
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("registry.sqlite")
}

/// Default staging directory for downloaded archives.
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("kspmod-staging")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            game: GameSettings {
                install_root: None,
                version: DEFAULT_GAME_VERSION.to_string(),
            },
            metadata: MetadataSettings {
                repo_url: DEFAULT_METADATA_REPO_URL.to_string(),
                branch: DEFAULT_METADATA_BRANCH.to_string(),
                last_known_commit_hash: None,
                parse_workers: DEFAULT_MAX_PARSE_WORKERS,
            },
            registry: RegistrySettings {
                store_path: default_store_path(),
                hide_incompatible: true,
                sort_field: SortField::Name,
                sort_order: SortOrder::Ascending,
            },
            install: InstallSettings {
                staging_dir: default_staging_dir(),
                max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
                verify_checksums: true,
            },
            network: NetworkSettings {
                timeout: DEFAULT_NETWORK_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                level: DEFAULT_LOG_LEVEL.to_string(),
                directory: None,
            },
            source: None,
        }
    }
}
