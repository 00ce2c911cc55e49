//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let install_root = config
        .game
        .install_root
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let last_hash = config
        .metadata
        .last_known_commit_hash
        .as_deref()
        .unwrap_or("");
    let log_dir = config
        .logging
        .directory
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();

    format!(
        r#"[game]
; Game install root (the directory that contains GameData)
install_root = {}
; Installed game version, used for compatibility checks
version = {}

[metadata]
; Git repository holding one descriptor file per package version
repo_url = {}
branch = {}
; Head commit of the last ingestion (managed by kspmod)
last_known_commit_hash = {}
; Threads used to parse descriptors (default: 4)
parse_workers = {}

[registry]
; SQLite file holding the parsed registry
store_path = {}
; Hide packages that do not support the installed game version
hide_incompatible = {}
; Sort field: name or identifier
sort_field = {}
; Sort order: ascending or descending
sort_order = {}

[install]
; Parent directory for per-batch download staging
staging_dir = {}
; Maximum concurrent archive downloads (default: 4)
max_concurrent_downloads = {}
; Verify published SHA-256 checksums of downloaded archives
verify_checksums = {}

[network]
; Timeout in seconds for git and HTTP operations (default: 120)
timeout = {}

[logging]
; Level filter when RUST_LOG is not set: error, warn, info, debug, trace
level = {}
; Directory for daily log files; empty logs to the console only
directory = {}
"#,
        install_root,
        config.game.version,
        config.metadata.repo_url,
        config.metadata.branch,
        last_hash,
        config.metadata.parse_workers,
        path_to_string(&config.registry.store_path),
        config.registry.hide_incompatible,
        config.registry.sort_field,
        config.registry.sort_order,
        path_to_string(&config.install.staging_dir),
        config.install.max_concurrent_downloads,
        config.install.verify_checksums,
        config.network.timeout,
        config.logging.level,
        log_dir,
    )
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
