//! Registry commands: update, list, search and info.

use console::style;

use super::common::{print_entries, spinner};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the update command.
pub async fn run_update(runner: &CliRunner, force: bool) -> Result<(), CliError> {
    runner.log_startup("update");
    let mut manager = runner.open_manager()?;

    let bar = spinner(format!(
        "Checking {} ...",
        manager.settings().metadata_repo_url
    ));
    let result = manager.update_registry(force).await;
    bar.finish_and_clear();

    match result? {
        Some(report) => {
            println!("Registry updated to {}", style(&report.commit_hash).cyan());
            println!("  Parsed:  {}", report.parsed);
            println!("  Failed:  {}", report.failed);
            println!("  Ignored: {}", report.ignored);
        }
        None => println!("Registry is already up to date."),
    }
    Ok(())
}

/// Run the list command.
pub fn run_list(runner: &CliRunner, all: bool) -> Result<(), CliError> {
    runner.log_startup("list");
    let mut manager = runner.open_manager()?;
    if all {
        manager.set_hide_incompatible(false);
    }

    if manager.registry().is_empty() {
        println!("The registry is empty. Run 'kspmod update' first.");
        return Ok(());
    }
    let entries = manager.index().to_vec();
    print_entries(&manager, &entries);
    Ok(())
}

/// Run the search command.
pub fn run_search(runner: &CliRunner, query: &str, all: bool) -> Result<(), CliError> {
    runner.log_startup("search");
    let mut manager = runner.open_manager()?;
    if all {
        manager.set_hide_incompatible(false);
    }

    let entries = manager.search(query).to_vec();
    print_entries(&manager, &entries);
    Ok(())
}

/// Run the info command.
pub fn run_info(runner: &CliRunner, identifier: &str) -> Result<(), CliError> {
    runner.log_startup("info");
    let manager = runner.open_manager()?;
    let package = manager
        .package(identifier)
        .ok_or_else(|| CliError::NotFound(format!("No package named '{}'", identifier)))?;

    println!("{}", style(&package.name).bold());
    println!("  Identifier:   {}", package.identifier);
    println!("  Version:      {}", package.version);
    println!("  Authors:      {}", package.authors.join(", "));
    println!("  Licenses:     {}", package.licenses.join(", "));
    println!(
        "  Game version: {} - {}{}",
        package.window.min,
        package.window.max,
        if package.compatible {
            String::new()
        } else {
            style(" (incompatible)").red().to_string()
        }
    );
    println!(
        "  Installed:    {}",
        if package.installed { "yes" } else { "no" }
    );
    if !package.depends.is_empty() {
        println!("  Depends:      {}", package.depends.join(", "));
    }
    if !package.conflicts.is_empty() {
        println!("  Conflicts:    {}", package.conflicts.join(", "));
    }
    println!("  Download:     {}", package.download.url);
    println!();
    println!("{}", package.summary);
    if let Some(description) = &package.description {
        println!();
        println!("{}", description);
    }
    Ok(())
}
