//! kspmod CLI - Command-line interface
//!
//! This binary drives the kspmod library: registry updates, listing and
//! searching, and applying install/remove batches.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::apply::Intent;
use commands::config::ConfigCommands;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "kspmod")]
#[command(version = kspmod::VERSION)]
#[command(about = "Package manager for Kerbal Space Program mods", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/kspmod/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the registry from the metadata repository
    Update {
        /// Re-ingest even when the repository has not changed
        #[arg(long)]
        force: bool,
    },

    /// List packages
    List {
        /// Include packages incompatible with the installed game version
        #[arg(long)]
        all: bool,
    },

    /// Search packages by name, identifier, author or abstract
    Search {
        /// Regular expression or plain text
        query: String,

        /// Include packages incompatible with the installed game version
        #[arg(long)]
        all: bool,
    },

    /// Show details of one package
    Info {
        /// Package identifier
        identifier: String,
    },

    /// Install packages and their dependencies
    Install {
        /// Package identifiers
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Remove installed packages
    Remove {
        /// Package identifiers
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let command = match cli.command {
        Commands::Config(command) => return commands::config::run(command, cli.config.as_deref()),
        other => other,
    };

    let runner = CliRunner::new(cli.config.as_deref(), cli.verbose)?;
    match command {
        Commands::Update { force } => commands::registry::run_update(&runner, force).await,
        Commands::List { all } => commands::registry::run_list(&runner, all),
        Commands::Search { query, all } => commands::registry::run_search(&runner, &query, all),
        Commands::Info { identifier } => commands::registry::run_info(&runner, &identifier),
        Commands::Install { identifiers } => {
            commands::apply::run(&runner, Intent::Install, &identifiers).await
        }
        Commands::Remove { identifiers } => {
            commands::apply::run(&runner, Intent::Remove, &identifiers).await
        }
        Commands::Config(_) => Ok(()),
    }
}
