//! Path containment checks.
//!
//! Every destination is checked twice: lexically (no `..` may climb above
//! the root) and physically (the nearest existing ancestor, once symlinks
//! are resolved, must still lie inside the canonical root).

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `relative` against `root` without touching the filesystem.
///
/// Returns `None` when the path is absolute, carries a prefix, or climbs
/// above `root` through `..`.
pub fn resolve_lexically(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(parts);
    Some(resolved)
}

/// The root-relative form of a lexically resolved destination.
pub fn relative_to_root<'a>(root: &Path, destination: &'a Path) -> Option<&'a Path> {
    destination.strip_prefix(root).ok()
}

/// Check that the nearest existing ancestor of `path` resolves inside
/// `canonical_root`.
pub fn ancestor_within(canonical_root: &Path, path: &Path) -> io::Result<bool> {
    let mut current = path;
    loop {
        match current.symlink_metadata() {
            Ok(_) => {
                let canonical = current.canonicalize()?;
                return Ok(canonical.starts_with(canonical_root));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(false),
            },
            Err(e) => return Err(e),
        }
    }
}
