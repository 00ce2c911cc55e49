//! Archive downloads.
//!
//! This module provides:
//! - Single archive downloads over async HTTP (`http`)
//! - SHA-256 checksum verification (`checksum`)
//! - Fail-fast concurrent batch downloads into a staging directory (`batch`)
//!
//! # Architecture
//!
//! ```text
//! download_batch
//!         │
//!         ├── Semaphore (max concurrent downloads)
//!         ├── CancellationToken (child of the caller's token)
//!         │
//!         └── FuturesUnordered<JoinHandle>
//!                 └── HttpDownloader::download → verify_checksum → rename
//! ```

mod batch;
mod checksum;
mod http;

pub use batch::{download_batch, BatchOptions, DownloadedBatch};
pub use checksum::{calculate_file_checksum, verify_checksum};
pub use http::HttpDownloader;
