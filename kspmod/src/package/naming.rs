//! Centralized naming conventions.
//!
//! This module is the single source of truth for:
//! - Registry store keys (e.g., `mod:17`)
//! - Staging archive filenames (e.g., `MechJeb2.zip`)
//! - Well-known directories inside the game install root
//!
//! All other modules should use these functions rather than constructing names directly.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Prefix for synthetic registry store keys.
pub const REGISTRY_KEY_PREFIX: &str = "mod:";

/// Directory that holds mod content inside the game install root.
pub const GAME_DATA_DIR: &str = "GameData";

/// Where archive entries that do not match their install rule end up.
pub const FALLBACK_INSTALL_DIR: &str = GAME_DATA_DIR;

/// Stock subtrees that mods must not overwrite.
pub const PROTECTED_SUBTREES: &[&str] = &["GameData/Squad", "GameData/SquadExpansion"];

/// Generate the registry store key for the `n`th stored package.
///
/// # Examples
///
/// ```
/// use kspmod::package::registry_key;
///
/// assert_eq!(registry_key(0), "mod:0");
/// assert_eq!(registry_key(42), "mod:42");
/// ```
pub fn registry_key(sequence: usize) -> String {
    format!("{}{}", REGISTRY_KEY_PREFIX, sequence)
}

/// Generate the staging filename for a package's downloaded archive.
///
/// Characters that are not safe in file names are replaced with `_`. When
/// anything was replaced, a digest of the raw identifier is appended after a
/// `.`, which a plain name never contains, so distinct identifiers never
/// share a staging file.
///
/// # Examples
///
/// ```
/// use kspmod::package::archive_filename;
///
/// assert_eq!(archive_filename("MechJeb2"), "MechJeb2.zip");
/// assert!(archive_filename("../evil").starts_with("___evil."));
/// assert_ne!(archive_filename("Foo.Bar"), archive_filename("Foo_Bar"));
/// ```
pub fn archive_filename(identifier: &str) -> String {
    let safe: String = identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe == identifier {
        return format!("{}.zip", safe);
    }

    let digest = format!("{:x}", Sha256::digest(identifier.as_bytes()));
    format!("{}.{}.zip", safe, &digest[..16])
}

/// Generate the filename used while a download is still in flight.
pub fn partial_filename(identifier: &str) -> String {
    format!("{}.part", archive_filename(identifier))
}

/// Check whether a root-relative path falls inside a protected stock subtree.
///
/// Comparison is per path component and case-insensitive, matching how the
/// game itself resolves `GameData` folders on case-insensitive filesystems.
pub fn is_protected(relative: &Path) -> bool {
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect();

    PROTECTED_SUBTREES.iter().any(|subtree| {
        let protected: Vec<String> = subtree.split('/').map(|s| s.to_lowercase()).collect();
        components.len() >= protected.len() && components[..protected.len()] == protected[..]
    })
}
