//! Per-destination write locks shared by concurrent extractions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::info;

/// Lock table keyed by destination path.
///
/// Two archives writing the same file take turns; the second writer is
/// logged so overwrites between packages are visible.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    writers: DashMap<PathBuf, String>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `path`.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Record `identifier` as the writer of `path`.
    ///
    /// Returns the previous writer when it was a different package.
    pub fn record_writer(&self, path: &Path, identifier: &str) -> Option<String> {
        let previous = self
            .writers
            .insert(path.to_path_buf(), identifier.to_string())
            .filter(|prev| prev != identifier);
        if let Some(prev) = &previous {
            info!(
                path = %path.display(),
                previous = %prev,
                current = identifier,
                "File overwritten by another package"
            );
        }
        previous
    }

    /// Forget every lock and writer.
    pub fn clear(&self) {
        self.locks.clear();
        self.writers.clear();
    }
}
