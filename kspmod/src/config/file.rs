//! Configuration file handling for `<config dir>/kspmod/config.ini`.
//!
//! Loads and saves user configuration with sensible defaults. Parsing lives
//! in [`super::parser`], serialization in [`super::writer`].

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::defaults::APP_DIR_NAME;
use super::settings::{ConfigFile, Settings};
use crate::version::Version;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// A required value is not set
    #[error("Missing configuration: {section}.{key} must be set")]
    MissingValue { section: String, key: String },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// Persists values that change while the manager runs.
pub trait SettingsSink: Send {
    /// Record the head commit of the latest successful ingestion.
    fn persist_commit_hash(&mut self, hash: &str) -> Result<(), ConfigFileError>;
}

impl ConfigFile {
    /// Load configuration from the default path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults that will be saved there.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let mut config = if path.exists() {
            let ini = Ini::load_from_file(path)?;
            super::parser::parse_ini(&ini)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration back to the file it was loaded from, or the
    /// default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = self.path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|source| ConfigFileError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The file this configuration is bound to.
    pub fn path(&self) -> PathBuf {
        self.source.clone().unwrap_or_else(config_file_path)
    }

    /// Validate and flatten into runtime [`Settings`].
    pub fn to_settings(&self) -> Result<Settings, ConfigFileError> {
        let install_root =
            self.game
                .install_root
                .clone()
                .ok_or_else(|| ConfigFileError::MissingValue {
                    section: "game".to_string(),
                    key: "install_root".to_string(),
                })?;
        let game_version: Version =
            self.game
                .version
                .parse()
                .map_err(|_| ConfigFileError::InvalidValue {
                    section: "game".to_string(),
                    key: "version".to_string(),
                    value: self.game.version.clone(),
                    reason: "expected a version like 1.12.5".to_string(),
                })?;

        let mut settings = Settings::new(install_root, game_version)
            .with_metadata_repo(&self.metadata.repo_url, &self.metadata.branch)
            .with_last_known_commit_hash(self.metadata.last_known_commit_hash.clone())
            .with_max_parse_workers(self.metadata.parse_workers)
            .with_store_path(self.registry.store_path.clone())
            .with_hide_incompatible(self.registry.hide_incompatible)
            .with_sort(self.registry.sort_field, self.registry.sort_order)
            .with_staging_dir(self.install.staging_dir.clone())
            .with_max_concurrent_downloads(self.install.max_concurrent_downloads)
            .with_verify_checksums(self.install.verify_checksums)
            .with_network_timeout_secs(self.network.timeout)
            .with_log_level(&self.logging.level);
        settings.log_dir = self.logging.directory.clone();
        Ok(settings)
    }
}

impl SettingsSink for ConfigFile {
    fn persist_commit_hash(&mut self, hash: &str) -> Result<(), ConfigFileError> {
        self.metadata.last_known_commit_hash = Some(hash.to_string());
        self.save()?;
        debug!(hash, path = %self.path().display(), "Commit hash persisted");
        Ok(())
    }
}

/// Get the path to the config directory (`<config dir>/kspmod`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Get the path to the config file (`<config dir>/kspmod/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
