//! Package installation.
//!
//! This module provides:
//! - Concurrent, fail-fast archive downloads into a staging directory
//!   (`download`)
//! - Zip extraction under strict path containment (`extractor`)
//! - Per-destination write locks shared across concurrent extractions
//!   (`locks`)
//! - The [`Installer`] tying them together, plus package removal
//!
//! # Apply cycle
//!
//! ```text
//! download_batch ──► DownloadedBatch (staging dir)
//!                          │
//!                          ▼
//! install_batch ──► spawn_blocking per archive
//!                          │
//!                          ├── plan: map entries, containment check
//!                          └── write: per-path lock, copy
//! ```
//!
//! There is no rollback: archives that finished before a failure stay
//! installed.

mod apply;
mod config;
mod containment;
mod download;
mod error;
mod extractor;
mod locks;

pub use apply::{InstallReport, Installer};
pub use config::InstallerConfig;
pub use containment::{ancestor_within, resolve_lexically};
pub use download::{
    calculate_file_checksum, download_batch, verify_checksum, BatchOptions, DownloadedBatch,
    HttpDownloader,
};
pub use error::{InstallError, InstallResult};
pub use extractor::{extract_archive, map_entry, ExtractReport};
pub use locks::PathLocks;
