//! Installed-state detection from the top level of `GameData`.

use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::package::{Package, GAME_DATA_DIR};

/// List the top-level entries of `install_root/GameData`.
///
/// Detection works on the same depth that removal deletes at, so a mod
/// bundled inside another mod's folder never counts as installed on its
/// own. A missing `GameData` directory yields an empty list.
pub fn scan_installed_artifacts(install_root: &Path) -> io::Result<Vec<String>> {
    let game_data = install_root.join(GAME_DATA_DIR);
    if !game_data.is_dir() {
        debug!(path = %game_data.display(), "No GameData directory");
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(&game_data)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(io::Error::from)?;
        artifacts.push(entry.file_name().to_string_lossy().into_owned());
    }
    artifacts.sort();

    debug!(count = artifacts.len(), "Scanned installed artifacts");
    Ok(artifacts)
}

/// Whether any artifact matches the package's install rule.
pub fn is_installed(package: &Package, artifacts: &[String]) -> bool {
    package.install.as_ref().is_some_and(|rule| {
        let matcher = rule.artifact_matcher();
        artifacts.iter().any(|a| matcher.matches(a))
    })
}
