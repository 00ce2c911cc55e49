//! kspmod - Package manager for Kerbal Space Program mods
//!
//! This library ingests a git repository of per-package descriptor files,
//! cleans them into validated [`package::Package`] records, computes
//! compatibility against the installed game version, resolves install and
//! remove requests into a dependency- and conflict-checked queue, and
//! installs the resulting batch into the game directory without ever
//! writing outside it.
//!
//! # High-Level API
//!
//! The [`session`] module provides the facade a front end drives:
//!
//! ```ignore
//! use kspmod::config::ConfigFile;
//! use kspmod::session::ModManager;
//!
//! let config = ConfigFile::load()?;
//! let mut manager = ModManager::open(config.to_settings()?, Box::new(config))?;
//!
//! manager.update_registry(false).await?;
//! manager.enqueue("MechJeb2")?;
//! let report = manager.apply_batch().await?;
//! ```

pub mod config;
pub mod descriptor;
pub mod ingest;
pub mod installer;
pub mod logging;
pub mod package;
pub mod queue;
pub mod registry;
pub mod session;
pub mod version;

/// Version of the kspmod library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
