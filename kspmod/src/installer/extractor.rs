//! Zip archive extraction under the install root.
//!
//! Extraction of one archive happens in two passes:
//! 1. **Plan**: map every entry onto a root-relative destination and run
//!    both containment checks. Any escape fails the package before a single
//!    byte is written.
//! 2. **Write**: create directories and copy files in entry order, taking the
//!    per-path lock for each file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::containment::{ancestor_within, relative_to_root, resolve_lexically};
use super::error::{InstallError, InstallResult};
use super::locks::PathLocks;
use crate::package::{is_protected, InstallRule, FALLBACK_INSTALL_DIR};

/// One archive entry mapped onto the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Index inside the archive.
    pub index: usize,
    /// Destination relative to the install root.
    pub relative: PathBuf,
    /// Absolute destination.
    pub destination: PathBuf,
    pub is_dir: bool,
    /// Whether the destination lies in a protected stock subtree.
    pub protected: bool,
}

/// What an extraction wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: usize,
    pub directories: usize,
    pub protected_writes: usize,
    /// Root-relative files last written by another package of the batch.
    pub overwritten: Vec<PathBuf>,
}

/// Map an archive entry name onto a root-relative path.
///
/// Entries containing the rule's `install_to` are anchored there; all other
/// entries go below `GameData/`.
pub fn map_entry(rule: &InstallRule, entry_name: &str) -> PathBuf {
    rule.anchor_entry(entry_name).unwrap_or_else(|| {
        let mut fallback = PathBuf::from(FALLBACK_INSTALL_DIR);
        fallback.extend(
            entry_name
                .split(['/', '\\'])
                .filter(|s| !s.is_empty() && *s != "."),
        );
        fallback
    })
}

/// Plan every entry of an archive, enforcing containment.
pub fn plan_archive<R: io::Read + io::Seek>(
    identifier: &str,
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    rule: &InstallRule,
    canonical_root: &Path,
) -> InstallResult<Vec<PlannedEntry>> {
    let mut planned = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| invalid_archive(identifier, archive_path, e))?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();
        drop(entry);

        let mapped = map_entry(rule, &name);
        let violation = || InstallError::PathContainmentViolation {
            identifier: identifier.to_string(),
            entry: name.clone(),
        };

        let destination = resolve_lexically(canonical_root, &mapped).ok_or_else(violation)?;
        let within = ancestor_within(canonical_root, &destination)
            .map_err(|e| InstallError::filesystem(&destination, e))?;
        if !within {
            return Err(violation());
        }

        let relative = relative_to_root(canonical_root, &destination)
            .map(Path::to_path_buf)
            .ok_or_else(violation)?;
        let protected = is_protected(&relative);

        planned.push(PlannedEntry {
            index,
            relative,
            destination,
            is_dir,
            protected,
        });
    }

    Ok(planned)
}

/// Extract the archive of `identifier` into `canonical_root`.
///
/// `canonical_root` must already be canonicalized. Entries are written
/// sequentially; cancellation is checked between entries.
pub fn extract_archive(
    identifier: &str,
    archive_path: &Path,
    rule: &InstallRule,
    canonical_root: &Path,
    locks: &PathLocks,
    cancel: &CancellationToken,
) -> InstallResult<ExtractReport> {
    let file = File::open(archive_path).map_err(|e| InstallError::filesystem(archive_path, e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| invalid_archive(identifier, archive_path, e))?;

    let planned = plan_archive(identifier, &mut archive, archive_path, rule, canonical_root)?;
    debug!(identifier, entries = planned.len(), "Archive planned");

    let mut report = ExtractReport::default();
    for entry in &planned {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        if entry.protected {
            warn!(
                identifier,
                path = %entry.relative.display(),
                "Writing into protected stock directory"
            );
            report.protected_writes += 1;
        }

        if entry.is_dir {
            fs::create_dir_all(&entry.destination)
                .map_err(|e| InstallError::filesystem(&entry.destination, e))?;
            report.directories += 1;
            continue;
        }

        if let Some(parent) = entry.destination.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::filesystem(parent, e))?;
            // Directories created above may have followed a symlink planted
            // by an earlier entry of another archive.
            let within = ancestor_within(canonical_root, parent)
                .map_err(|e| InstallError::filesystem(parent, e))?;
            if !within {
                return Err(InstallError::PathContainmentViolation {
                    identifier: identifier.to_string(),
                    entry: entry.relative.display().to_string(),
                });
            }
        }

        let lock = locks.lock_for(&entry.destination);
        let _guard = lock.lock();
        if locks.record_writer(&entry.destination, identifier).is_some() {
            report.overwritten.push(entry.relative.clone());
        }

        let mut source = archive
            .by_index(entry.index)
            .map_err(|e| invalid_archive(identifier, archive_path, e))?;
        let mut out = File::create(&entry.destination)
            .map_err(|e| InstallError::filesystem(&entry.destination, e))?;
        io::copy(&mut source, &mut out)
            .map_err(|e| InstallError::filesystem(&entry.destination, e))?;
        report.files += 1;
    }

    debug!(
        identifier,
        files = report.files,
        directories = report.directories,
        "Archive extracted"
    );
    Ok(report)
}

fn invalid_archive(identifier: &str, path: &Path, error: impl std::fmt::Display) -> InstallError {
    InstallError::InvalidArchive {
        identifier: identifier.to_string(),
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::InstallMatcher;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(body).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn rule() -> InstallRule {
        InstallRule::new(InstallMatcher::Find("Foo".into()), "GameData")
    }

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        archive: PathBuf,
    }

    fn fixture(entries: &[(&str, &[u8])]) -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("ksp");
        fs::create_dir_all(&root).unwrap();
        let root = root.canonicalize().unwrap();
        let archive = temp.path().join("foo.zip");
        write_zip(&archive, entries);
        Fixture {
            _temp: temp,
            root,
            archive,
        }
    }

    #[test]
    fn test_map_entry() {
        assert_eq!(
            map_entry(&rule(), "Foo-1.0/GameData/Foo/Foo.dll"),
            PathBuf::from("GameData/Foo/Foo.dll")
        );
        assert_eq!(
            map_entry(&rule(), "README.txt"),
            PathBuf::from("GameData/README.txt")
        );
    }

    #[test]
    fn test_extracts_anchored_entries() {
        let fx = fixture(&[
            ("Foo-1.0/GameData/Foo/", b""),
            ("Foo-1.0/GameData/Foo/Foo.dll", b"dll"),
            ("Foo-1.0/README.txt", b"readme"),
        ]);

        let report = extract_archive(
            "Foo",
            &fx.archive,
            &rule(),
            &fx.root,
            &PathLocks::new(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(
            fs::read(fx.root.join("GameData/Foo/Foo.dll")).unwrap(),
            b"dll"
        );
        assert!(fx.root.join("GameData/Foo-1.0/README.txt").exists());
    }

    #[test]
    fn test_traversal_entry_rejected_before_any_write() {
        let fx = fixture(&[
            ("GameData/Foo/ok.cfg", b"ok"),
            ("../../etc/passwd", b"pwned"),
        ]);
        let evil = InstallRule::new(InstallMatcher::Find("Foo".into()), "..");

        let err = extract_archive(
            "Foo",
            &fx.archive,
            &evil,
            &fx.root,
            &PathLocks::new(),
            &CancellationToken::new(),
        )
        .unwrap_err();

        assert!(matches!(err, InstallError::PathContainmentViolation { .. }));
        assert!(!fx.root.join("GameData/Foo/ok.cfg").exists());
        assert!(!fx.root.parent().unwrap().join("etc/passwd").exists());
    }

    #[test]
    fn test_protected_writes_are_counted() {
        let fx = fixture(&[("GameData/Squad/Parts/x.cfg", b"x")]);
        let report = extract_archive(
            "Foo",
            &fx.archive,
            &rule(),
            &fx.root,
            &PathLocks::new(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(report.protected_writes, 1);
    }

    #[test]
    fn test_cancelled_extraction_writes_nothing() {
        let fx = fixture(&[("GameData/Foo/a.cfg", b"a")]);
        let token = CancellationToken::new();
        token.cancel();

        let err = extract_archive(
            "Foo",
            &fx.archive,
            &rule(),
            &fx.root,
            &PathLocks::new(),
            &token,
        )
        .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!fx.root.join("GameData/Foo/a.cfg").exists());
    }

    #[test]
    fn test_not_a_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();
        let root = temp.path().canonicalize().unwrap();

        let err = extract_archive(
            "Bad",
            &archive,
            &rule(),
            &root,
            &PathLocks::new(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, InstallError::InvalidArchive { .. }));
    }
}
