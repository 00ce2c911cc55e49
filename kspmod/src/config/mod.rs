//! Configuration.
//!
//! [`ConfigFile`] is the user's `config.ini`, one struct per section.
//! [`ConfigFile::to_settings`] validates it into the flat [`Settings`] value
//! that is passed explicitly into each component; nothing reads
//! configuration globally.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use kspmod::config::Settings;
//!
//! let settings = Settings::new(PathBuf::from("/games/KSP"), "1.12.5".parse().unwrap())
//!     .with_max_concurrent_downloads(8)
//!     .with_hide_incompatible(false);
//!
//! let installer = settings.installer_config();
//! assert_eq!(installer.max_concurrent_downloads, 8);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError, SettingsSink};
pub use settings::{
    ConfigFile, GameSettings, InstallSettings, LoggingSettings, MetadataSettings,
    NetworkSettings, RegistrySettings, Settings,
};
