//! Async HTTP archive downloader.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::installer::error::{InstallError, InstallResult};

/// HTTP downloader shared by all tasks of a batch.
///
/// The client timeout covers the whole request including the body, so every
/// download has a deadline.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader with the given per-request deadline.
    pub fn new(timeout: Duration) -> InstallResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kspmod/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InstallError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// Stops with [`InstallError::Cancelled`] as soon as `cancel` fires. A
    /// partially written `dest` is left for the caller's staging cleanup.
    pub async fn download(
        &self,
        identifier: &str,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> InstallResult<u64> {
        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InstallError::Cancelled),
            response = self.client.get(url).send() => {
                response.map_err(|e| self.classify(identifier, url, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::HttpStatus {
                identifier: identifier.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| InstallError::filesystem(dest, e))?;

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InstallError::Cancelled),
                chunk = response.chunk() => chunk.map_err(|e| self.classify(identifier, url, e))?,
            };

            let Some(bytes) = chunk else {
                break;
            };
            file.write_all(&bytes)
                .await
                .map_err(|e| InstallError::filesystem(dest, e))?;
            written += bytes.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| InstallError::filesystem(dest, e))?;

        debug!(identifier, url, bytes = written, "Downloaded archive");
        Ok(written)
    }

    fn classify(&self, identifier: &str, url: &str, error: reqwest::Error) -> InstallError {
        if error.is_timeout() {
            InstallError::Timeout {
                identifier: identifier.to_string(),
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            InstallError::Network {
                identifier: identifier.to_string(),
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}
