//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [game] section
    if let Some(section) = ini.section(Some("game")) {
        if let Some(v) = non_empty(section.get("install_root")) {
            config.game.install_root = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("version")) {
            config.game.version = v.to_string();
        }
    }

    // [metadata] section
    if let Some(section) = ini.section(Some("metadata")) {
        if let Some(v) = non_empty(section.get("repo_url")) {
            config.metadata.repo_url = v.to_string();
        }
        if let Some(v) = non_empty(section.get("branch")) {
            config.metadata.branch = v.to_string();
        }
        if let Some(v) = non_empty(section.get("last_known_commit_hash")) {
            config.metadata.last_known_commit_hash = Some(v.to_string());
        }
        if let Some(v) = section.get("parse_workers") {
            config.metadata.parse_workers =
                parse_positive("metadata", "parse_workers", v)?;
        }
    }

    // [registry] section
    if let Some(section) = ini.section(Some("registry")) {
        if let Some(v) = non_empty(section.get("store_path")) {
            config.registry.store_path = expand_tilde(v);
        }
        if let Some(v) = section.get("hide_incompatible") {
            config.registry.hide_incompatible = parse_bool(v);
        }
        if let Some(v) = section.get("sort_field") {
            config.registry.sort_field = parse_enum("registry", "sort_field", v, "name or identifier")?;
        }
        if let Some(v) = section.get("sort_order") {
            config.registry.sort_order =
                parse_enum("registry", "sort_order", v, "ascending or descending")?;
        }
    }

    // [install] section
    if let Some(section) = ini.section(Some("install")) {
        if let Some(v) = non_empty(section.get("staging_dir")) {
            config.install.staging_dir = expand_tilde(v);
        }
        if let Some(v) = section.get("max_concurrent_downloads") {
            config.install.max_concurrent_downloads =
                parse_positive("install", "max_concurrent_downloads", v)?;
        }
        if let Some(v) = section.get("verify_checksums") {
            config.install.verify_checksums = parse_bool(v);
        }
    }

    // [network] section
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = section.get("timeout") {
            config.network.timeout = v.trim().parse().ok().filter(|t| *t > 0).ok_or_else(|| {
                ConfigFileError::InvalidValue {
                    section: "network".to_string(),
                    key: "timeout".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                }
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("level")) {
            config.logging.level = v.to_lowercase();
        }
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = Some(expand_tilde(v));
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer".to_string(),
        })
}

fn parse_enum<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    expected: &str,
) -> Result<T, ConfigFileError> {
    value.parse().map_err(|_| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("must be {}", expected),
    })
}

/// Parse a boolean the way INI files tend to write them.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
