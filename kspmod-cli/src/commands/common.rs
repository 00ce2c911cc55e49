//! Common utilities shared across CLI commands.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use kspmod::package::Package;
use kspmod::registry::IndexEntry;
use kspmod::session::ModManager;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

/// Start a spinner with the given message.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Cancel `token` on Ctrl+C.
pub fn cancel_on_ctrlc(token: CancellationToken) -> Result<(), CliError> {
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, cancelling...");
        token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))
}

/// One-line summary of a package for listings.
pub fn format_row(package: &Package) -> String {
    let marker = if package.installed {
        style("[I]").green().to_string()
    } else {
        "   ".to_string()
    };
    let identifier = if package.compatible {
        style(&package.identifier).bold().to_string()
    } else {
        style(&package.identifier).dim().to_string()
    };
    format!(
        "{} {:<32} {:<14} {}",
        marker,
        identifier,
        package.version.to_string(),
        package.summary
    )
}

/// Print every index entry of the session.
pub fn print_entries(manager: &ModManager, entries: &[IndexEntry]) {
    for entry in entries {
        if let Some(package) = manager.package(&entry.identifier) {
            println!("{}", format_row(package));
        }
    }
    println!();
    println!("{} package(s)", entries.len());
}
