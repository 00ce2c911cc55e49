//! Configuration management CLI commands.
//!
//! Provides `config path` and `config show` for inspecting the settings the
//! other commands run with.

use std::path::Path;

use clap::Subcommand;
use kspmod::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(&ConfigFile::load_from(&path)?),
    }
}

fn run_show(config: &ConfigFile) -> Result<(), CliError> {
    let not_set = || "(not set)".to_string();

    println!("Configuration Settings");
    println!("======================");
    println!();
    println!("[game]");
    println!(
        "  install_root = {}",
        config
            .game
            .install_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(not_set)
    );
    println!("  version = {}", config.game.version);
    println!();
    println!("[metadata]");
    println!("  repo_url = {}", config.metadata.repo_url);
    println!("  branch = {}", config.metadata.branch);
    println!(
        "  last_known_commit_hash = {}",
        config
            .metadata
            .last_known_commit_hash
            .clone()
            .unwrap_or_else(not_set)
    );
    println!("  parse_workers = {}", config.metadata.parse_workers);
    println!();
    println!("[registry]");
    println!("  store_path = {}", config.registry.store_path.display());
    println!("  hide_incompatible = {}", config.registry.hide_incompatible);
    println!("  sort_field = {}", config.registry.sort_field);
    println!("  sort_order = {}", config.registry.sort_order);
    println!();
    println!("[install]");
    println!("  staging_dir = {}", config.install.staging_dir.display());
    println!(
        "  max_concurrent_downloads = {}",
        config.install.max_concurrent_downloads
    );
    println!("  verify_checksums = {}", config.install.verify_checksums);
    println!();
    println!("[network]");
    println!("  timeout = {}", config.network.timeout);
    println!();
    println!("[logging]");
    println!("  level = {}", config.logging.level);
    println!(
        "  directory = {}",
        config
            .logging
            .directory
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(not_set)
    );
    Ok(())
}
