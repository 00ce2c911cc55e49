//! SQLite-backed registry store.
//!
//! The store is a flat key/value table: each row maps a synthetic key
//! (`mod:<n>`) to one serialized [`Package`]. It is rewritten wholesale on
//! every successful ingestion inside a single transaction, so readers never
//! observe a half-written registry.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::debug;

use crate::package::{registry_key, Package};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS registry (
    key     TEXT PRIMARY KEY,
    seq     INTEGER NOT NULL,
    package TEXT NOT NULL
);
"#;

/// Result type for registry store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A package could not be serialized.
    #[error("failed to encode package {identifier}: {source}")]
    Encode {
        identifier: String,
        source: serde_json::Error,
    },

    /// A stored row does not decode into a package.
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },

    /// The database directory could not be created.
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Persistent registry of valid packages.
pub struct RegistryStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore").finish_non_exhaustive()
    }
}

impl RegistryStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!(path = %path.display(), "Registry store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Replace the whole registry with `packages`, keyed `mod:0..n` in order.
    ///
    /// Returns the number of rows written.
    pub fn replace_all(&self, packages: &[Package]) -> StoreResult<usize> {
        let rows = packages
            .iter()
            .map(|package| {
                serde_json::to_string(package).map_err(|source| StoreError::Encode {
                    identifier: package.identifier.clone(),
                    source,
                })
            })
            .collect::<StoreResult<Vec<String>>>()?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM registry", [])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO registry (key, seq, package) VALUES (?1, ?2, ?3)")?;
            for (seq, json) in rows.iter().enumerate() {
                insert.execute(params![registry_key(seq), seq as i64, json])?;
            }
        }
        tx.commit()?;

        debug!(rows = rows.len(), "Registry store replaced");
        Ok(rows.len())
    }

    /// Load every stored package in insertion order.
    pub fn load_all(&self) -> StoreResult<Vec<Package>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, package FROM registry ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut packages = Vec::new();
        for row in rows {
            let (key, json) = row?;
            let package = serde_json::from_str(&json)
                .map_err(|source| StoreError::Decode { key, source })?;
            packages.push(package);
        }
        Ok(packages)
    }

    /// Number of stored packages.
    pub fn len(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM registry", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the store holds no packages.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
