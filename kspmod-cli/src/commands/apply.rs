//! Install and remove commands.
//!
//! Both build a queue from the requested identifiers, print it, and apply it
//! as one batch.

use console::style;
use kspmod::queue::Bucket;
use kspmod::session::ModManager;

use super::common::{cancel_on_ctrlc, spinner};
use crate::error::CliError;
use crate::runner::CliRunner;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Install,
    Remove,
}

/// Run the install or remove command.
pub async fn run(runner: &CliRunner, intent: Intent, identifiers: &[String]) -> Result<(), CliError> {
    runner.log_startup(match intent {
        Intent::Install => "install",
        Intent::Remove => "remove",
    });
    let mut manager = runner.open_manager()?;

    for identifier in identifiers {
        let installed = manager
            .package(identifier)
            .ok_or_else(|| CliError::NotFound(format!("No package named '{}'", identifier)))?
            .installed;

        match (intent, installed) {
            (Intent::Install, true) => {
                println!("{} is already installed, skipping", identifier);
                continue;
            }
            (Intent::Remove, false) => {
                println!("{} is not installed, skipping", identifier);
                continue;
            }
            _ => {}
        }

        for warning in manager.enqueue(identifier)? {
            println!("{} {}", style("warning:").yellow(), warning);
        }
    }

    if manager.queue().is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }
    print_queue(&manager);

    cancel_on_ctrlc(manager.cancel_token())?;
    let bar = spinner("Applying changes...");
    let result = manager.apply_batch().await;
    bar.finish_and_clear();
    let report = result?;

    for identifier in &report.removed {
        println!("{} {}", style("Removed").red(), identifier);
    }
    for identifier in &report.installed {
        println!("{} {}", style("Installed").green(), identifier);
    }
    for path in &report.overwritten_paths {
        println!("{} {} was written by more than one mod", style("warning:").yellow(), path);
    }
    Ok(())
}

fn print_queue(manager: &ModManager) {
    let queue = manager.queue();
    for (bucket, label) in [
        (Bucket::Remove, "Remove"),
        (Bucket::Install, "Install"),
        (Bucket::Dependency, "Dependencies"),
    ] {
        let packages = queue.bucket(bucket);
        if packages.is_empty() {
            continue;
        }
        println!("{}:", style(label).bold());
        for package in packages {
            println!("  {}", package);
        }
    }
    println!();
}
