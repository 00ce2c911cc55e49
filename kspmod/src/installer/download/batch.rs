//! Concurrent, fail-fast batch downloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checksum::verify_checksum;
use super::http::HttpDownloader;
use crate::installer::error::{InstallError, InstallResult};
use crate::package::{archive_filename, partial_filename, Package};

/// Archives fetched for one apply cycle.
///
/// Owns the staging directory: dropping the batch deletes every archive and
/// any leftover partial file.
#[derive(Debug)]
pub struct DownloadedBatch {
    staging: TempDir,
    archives: HashMap<String, PathBuf>,
}

impl DownloadedBatch {
    /// Path of the downloaded archive for `identifier`.
    pub fn archive(&self, identifier: &str) -> Option<&Path> {
        self.archives.get(identifier).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// The per-batch staging directory.
    pub fn staging_path(&self) -> &Path {
        self.staging.path()
    }
}

/// Options for one batch download.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub staging_dir: PathBuf,
    pub max_concurrent: usize,
    pub verify_checksums: bool,
}

/// Download every package's archive into a fresh staging directory.
///
/// Downloads run as tokio tasks bounded by a semaphore. The first failure
/// cancels the remaining tasks and the batch fails with that package's
/// error; the staging directory is removed before returning in every
/// failure case.
pub async fn download_batch(
    downloader: &HttpDownloader,
    packages: &[Package],
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> InstallResult<DownloadedBatch> {
    std::fs::create_dir_all(&options.staging_dir)
        .map_err(|e| InstallError::filesystem(&options.staging_dir, e))?;
    let staging = tempfile::Builder::new()
        .prefix("batch-")
        .tempdir_in(&options.staging_dir)
        .map_err(|e| InstallError::filesystem(&options.staging_dir, e))?;

    info!(
        packages = packages.len(),
        staging = %staging.path().display(),
        "Downloading batch"
    );

    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let batch_token = cancel.child_token();
    let mut tasks = FuturesUnordered::new();

    for package in packages {
        let identifier = package.identifier.clone();
        let url = package.download.url.clone();
        let expected = package
            .download
            .sha256
            .clone()
            .filter(|_| options.verify_checksums);
        let partial = staging.path().join(partial_filename(&identifier));
        let dest = staging.path().join(archive_filename(&identifier));
        let downloader = downloader.clone();
        let semaphore = Arc::clone(&semaphore);
        let token = batch_token.clone();

        tasks.push(tokio::spawn(async move {
            let result = async {
                let _permit = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(InstallError::Cancelled),
                    permit = semaphore.acquire_owned() => {
                        permit.map_err(|_| InstallError::Cancelled)?
                    }
                };
                fetch_archive(&downloader, &identifier, &url, &partial, &dest, expected, &token)
                    .await
            }
            .await;
            (identifier, result)
        }));
    }

    let mut archives = HashMap::with_capacity(packages.len());
    let mut failure: Option<InstallError> = None;

    while let Some(joined) = tasks.next().await {
        match joined {
            Ok((identifier, Ok(path))) => {
                debug!(identifier = %identifier, "Archive ready");
                archives.insert(identifier, path);
            }
            Ok((identifier, Err(error))) => {
                if failure.is_none() && !error.is_cancelled() {
                    warn!(identifier = %identifier, error = %error, "Download failed, cancelling batch");
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

    // Every task has finished, so nothing writes into staging any more.
    if let Some(error) = failure {
        drop(staging);
        return Err(error);
    }
    if cancel.is_cancelled() {
        drop(staging);
        info!("Batch download cancelled");
        return Err(InstallError::Cancelled);
    }

    info!(archives = archives.len(), "Batch downloaded");
    Ok(DownloadedBatch { staging, archives })
}

async fn fetch_archive(
    downloader: &HttpDownloader,
    identifier: &str,
    url: &str,
    partial: &Path,
    dest: &Path,
    expected_sha256: Option<String>,
    cancel: &CancellationToken,
) -> InstallResult<PathBuf> {
    downloader.download(identifier, url, partial, cancel).await?;

    if let Some(expected) = expected_sha256 {
        let id = identifier.to_string();
        let path = partial.to_path_buf();
        tokio::task::spawn_blocking(move || verify_checksum(&id, &path, &expected))
            .await
            .map_err(|e| InstallError::TaskFailed {
                reason: e.to_string(),
            })??;
    }

    tokio::fs::rename(partial, dest)
        .await
        .map_err(|e| InstallError::filesystem(dest, e))?;
    Ok(dest.to_path_buf())
}
