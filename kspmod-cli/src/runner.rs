//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and session
//! creation to reduce duplication across command handlers.

use std::path::{Path, PathBuf};

use kspmod::config::{config_file_path, ConfigFile};
use kspmod::logging::{init_logging, LoggingGuard};
use kspmod::session::ModManager;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file, or `None` for the default
    /// * `verbosity` - Number of `-v` flags; overrides the configured level
    pub fn new(config_path: Option<&Path>, verbosity: u8) -> Result<Self, CliError> {
        let path: PathBuf = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&path)?;

        let level = match verbosity {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        let logging_guard = init_logging(&level, config.logging.directory.as_deref())
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("kspmod v{}", kspmod::VERSION);
        info!(config = %self.config.path().display(), "kspmod CLI: {} command", command);
    }

    /// Open a mod manager session from the loaded configuration.
    ///
    /// The configuration file doubles as the settings sink, so a new commit
    /// hash is written back to the same file.
    pub fn open_manager(&self) -> Result<ModManager, CliError> {
        let settings = self.config.to_settings()?;
        Ok(ModManager::open(settings, Box::new(self.config.clone()))?)
    }
}
