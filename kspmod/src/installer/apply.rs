//! The installer: batch download, extraction and removal.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::InstallerConfig;
use super::containment::{ancestor_within, resolve_lexically};
use super::download::{download_batch, BatchOptions, DownloadedBatch, HttpDownloader};
use super::error::{InstallError, InstallResult};
use super::extractor::extract_archive;
use super::locks::PathLocks;
use crate::package::{is_protected, Package, GAME_DATA_DIR};
use crate::registry::scan_installed_artifacts;

/// What one `install_batch` call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Installed identifiers, sorted.
    pub installed: Vec<String>,
    /// Root-relative files written by more than one package, sorted.
    pub overwritten: Vec<String>,
}

/// Downloads, installs and removes packages under one install root.
#[derive(Debug)]
pub struct Installer {
    config: InstallerConfig,
    downloader: HttpDownloader,
    locks: Arc<PathLocks>,
}

impl Installer {
    /// Create an installer for the configured install root.
    pub fn new(config: InstallerConfig) -> InstallResult<Self> {
        let downloader = HttpDownloader::new(config.timeout)?;
        Ok(Self {
            config,
            downloader,
            locks: Arc::new(PathLocks::new()),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Fetch every package's archive into a fresh staging directory.
    pub async fn download_batch(
        &self,
        packages: &[Package],
        cancel: &CancellationToken,
    ) -> InstallResult<DownloadedBatch> {
        let options = BatchOptions {
            staging_dir: self.config.staging_dir.clone(),
            max_concurrent: self.config.max_concurrent_downloads,
            verify_checksums: self.config.verify_checksums,
        };
        download_batch(&self.downloader, packages, &options, cancel).await
    }

    /// Extract a downloaded batch under the install root.
    ///
    /// Archives extract concurrently, one blocking task each. The first
    /// failure cancels the rest and is returned as `BatchFailed`; archives
    /// that finished before it stay installed. Consumes the batch, so the
    /// staging directory is removed when this returns.
    ///
    /// Files written by two packages are serialized through the path locks;
    /// the later writer wins and the path is reported as overwritten.
    pub async fn install_batch(
        &self,
        batch: DownloadedBatch,
        packages: &[Package],
        cancel: &CancellationToken,
    ) -> InstallResult<InstallReport> {
        let root = self.canonical_root()?;

        // Resolve every archive and rule before spawning, so a missing one
        // fails the batch with no extraction running.
        let mut jobs = Vec::with_capacity(packages.len());
        for package in packages {
            let identifier = package.identifier.clone();
            let archive = batch
                .archive(&identifier)
                .map(Path::to_path_buf)
                .ok_or_else(|| InstallError::NotDownloaded {
                    identifier: identifier.clone(),
                })?;
            let rule = package
                .install
                .clone()
                .ok_or_else(|| InstallError::MissingInstallRule {
                    identifier: identifier.clone(),
                })?;
            jobs.push((identifier, archive, rule));
        }

        let batch_token = cancel.child_token();
        let mut tasks = FuturesUnordered::new();

        for (identifier, archive, rule) in jobs {
            let root = root.clone();
            let locks = Arc::clone(&self.locks);
            let token = batch_token.clone();

            tasks.push(tokio::task::spawn_blocking(move || {
                let result =
                    extract_archive(&identifier, &archive, &rule, &root, &locks, &token);
                (identifier, result)
            }));
        }

        let mut report = InstallReport::default();
        let mut failure: Option<InstallError> = None;

        while let Some(joined) = tasks.next().await {
            match joined {
                Ok((identifier, Ok(extracted))) => {
                    info!(
                        identifier = %identifier,
                        files = extracted.files,
                        "Package installed"
                    );
                    report.overwritten.extend(
                        extracted
                            .overwritten
                            .iter()
                            .map(|p| p.to_string_lossy().replace('\\', "/")),
                    );
                    report.installed.push(identifier);
                }
                Ok((identifier, Err(error))) => {
                    if failure.is_none() && !error.is_cancelled() {
                        warn!(identifier = %identifier, error = %error, "Install failed, cancelling batch");
                        batch_token.cancel();
                        failure = Some(InstallError::batch(identifier, error));
                    }
                }
                Err(join_error) => {
                    if failure.is_none() {
                        batch_token.cancel();
                        failure = Some(InstallError::TaskFailed {
                            reason: join_error.to_string(),
                        });
                    }
                }
            }
        }

        drop(batch);
        self.locks.clear();

        if let Some(error) = failure {
            return Err(error);
        }
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        report.installed.sort();
        report.overwritten.sort();
        report.overwritten.dedup();
        Ok(report)
    }

    /// Delete the top-level `GameData` artifacts of each package.
    ///
    /// `remaining` are the packages that stay installed; a warning is logged
    /// for each one that still depends on a removed package. Protected stock
    /// folders are never deleted.
    ///
    /// Returns the root-relative paths that were deleted.
    pub fn remove_packages(
        &self,
        packages: &[Package],
        remaining: &[&Package],
    ) -> InstallResult<Vec<String>> {
        let root = self.canonical_root()?;
        let game_data = root.join(GAME_DATA_DIR);
        if !game_data.is_dir() {
            debug!(path = %game_data.display(), "Nothing to remove");
            return Ok(Vec::new());
        }
        if !ancestor_within(&root, &game_data).map_err(|e| InstallError::filesystem(&game_data, e))? {
            return Err(InstallError::PathContainmentViolation {
                identifier: packages
                    .first()
                    .map(|p| p.identifier.clone())
                    .unwrap_or_default(),
                entry: GAME_DATA_DIR.to_string(),
            });
        }

        let top_level = scan_installed_artifacts(&root)
            .map_err(|e| InstallError::filesystem(&game_data, e))?;
        let removed_ids: HashSet<&str> = packages.iter().map(|p| p.identifier.as_str()).collect();
        let mut deleted = Vec::new();

        for package in packages {
            let Some(rule) = &package.install else {
                warn!(identifier = %package.identifier, "No install rule, nothing to remove");
                continue;
            };

            let matcher = rule.artifact_matcher();
            for name in top_level.iter().filter(|n| matcher.matches(n)) {
                let relative = Path::new(GAME_DATA_DIR).join(name);
                let target = resolve_lexically(&root, &relative).ok_or_else(|| {
                    InstallError::PathContainmentViolation {
                        identifier: package.identifier.clone(),
                        entry: name.clone(),
                    }
                })?;

                if is_protected(&relative) {
                    warn!(
                        identifier = %package.identifier,
                        path = %relative.display(),
                        "Refusing to remove protected stock directory"
                    );
                    continue;
                }

                if remove_entry(&target)? {
                    info!(identifier = %package.identifier, path = %relative.display(), "Removed");
                    deleted.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }

            for dependent in remaining
                .iter()
                .filter(|p| !removed_ids.contains(p.identifier.as_str()))
                .filter(|p| p.depends.iter().any(|d| d == &package.identifier))
            {
                warn!(
                    removed = %package.identifier,
                    dependent = %dependent.identifier,
                    "Installed package depends on a removed package"
                );
            }
        }

        Ok(deleted)
    }

    fn canonical_root(&self) -> InstallResult<PathBuf> {
        let root = &self.config.install_root;
        fs::create_dir_all(root).map_err(|e| InstallError::filesystem(root, e))?;
        root.canonicalize()
            .map_err(|e| InstallError::filesystem(root, e))
    }
}

/// Remove a file, directory tree or symlink. Symlinks are unlinked, never
/// followed. Returns `false` when the entry was already gone.
fn remove_entry(path: &Path) -> InstallResult<bool> {
    let metadata = match path.symlink_metadata() {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(InstallError::filesystem(path, e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| InstallError::filesystem(path, e))?;
    Ok(true)
}
