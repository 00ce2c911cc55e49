//! Mod package records and their on-disk conventions.
//!
//! This module provides the data structures shared by every stage of the
//! pipeline, from descriptor normalization through installation.
//!
//! # Overview
//!
//! - **Package**: one validated version of a mod, as produced by the
//!   descriptor normalizer and stored in the registry
//! - **InstallRule**: how to recognise the mod on disk and where its archive
//!   entries belong under the game directory
//! - **Download**: archive URL with optional integrity data
//!
//! # Type Hierarchy
//!
//! ```text
//! Package
//! ├── identifier / name / authors / licenses
//! ├── version: ParsedVersion
//! ├── window: CompatibilityWindow
//! ├── install: Option<InstallRule>
//! │   ├── matcher: Find | File | FindRegex
//! │   └── install_to
//! ├── download: Download
//! ├── depends / conflicts: Vec<String>
//! └── compatible / installed / downloaded / valid / errors
//! ```

mod core;
mod install_rule;
mod naming;

pub use core::{Download, Field, FieldError, FieldErrorKind, Package};
pub use install_rule::{ArtifactMatcher, InstallMatcher, InstallRule};
pub use naming::{
    archive_filename, is_protected, partial_filename, registry_key, FALLBACK_INSTALL_DIR,
    GAME_DATA_DIR, PROTECTED_SUBTREES, REGISTRY_KEY_PREFIX,
};
