//! SQLite hash store for persistent storage.

use super::{file_mtime, HashNormalization, HashRecord, HashStore};
use crate::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// SQLite-backed persistent hash store
///
/// All access goes through one connection behind a mutex, so a single
/// store instance is safe to share but never has concurrent writers.
pub struct SqliteHashStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    normalization: HashNormalization,
}

impl SqliteHashStore {
    /// Open or create a hash database at the given path.
    ///
    /// The schema is created if absent, so this is safe to call on every
    /// startup.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_hashes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT UNIQUE,
                hash TEXT,
                mtime REAL
            )",
            [],
        )?;

        // hash_exists runs once per scanned file
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_file_hashes_hash ON file_hashes(hash)",
            [],
        )?;

        info!(path = %path.display(), "Loaded hash database");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            normalization: HashNormalization::default(),
        })
    }

    /// Open a hash database that must already exist.
    ///
    /// Returns `StoreError::Unavailable` when the file is missing, letting
    /// the caller decide whether a fresh database should be created.
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::Unavailable {
                path: path.to_path_buf(),
                reason: "database file does not exist".to_string(),
            });
        }
        Self::open(path)
    }

    /// Use a different fingerprint normalization
    pub fn with_normalization(mut self, normalization: HashNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned {
            path: self.db_path.clone(),
        })
    }
}

impl HashStore for SqliteHashStore {
    fn get_record(&self, path: &Path) -> Result<Option<HashRecord>, StoreError> {
        let conn = self.lock()?;
        let path_str = path.to_string_lossy();

        let record = conn
            .query_row(
                "SELECT hash, mtime FROM file_hashes WHERE path = ?",
                [&path_str],
                |row| {
                    Ok(HashRecord {
                        path: path.to_path_buf(),
                        hash: row.get(0)?,
                        mtime: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn hash_exists(&self, hash: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let hash = self.normalization.apply(hash);

        let found = conn
            .query_row(
                "SELECT 1 FROM file_hashes WHERE hash = ? LIMIT 1",
                [hash.as_ref()],
                |_| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    fn paths_with_hash(&self, hash: &str) -> Result<Vec<PathBuf>, StoreError> {
        let conn = self.lock()?;
        let hash = self.normalization.apply(hash);

        let mut stmt = conn.prepare("SELECT path FROM file_hashes WHERE hash = ? ORDER BY id")?;
        let paths = stmt
            .query_map([hash.as_ref()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(paths.into_iter().map(PathBuf::from).collect())
    }

    fn add_or_update(&self, path: &Path, hash: &str) -> Result<(), StoreError> {
        let mtime = file_mtime(path)?;
        let hash = self.normalization.apply(hash);
        let conn = self.lock()?;
        let path_str = path.to_string_lossy();

        // Upsert keeps the row id stable when a path is re-registered
        conn.execute(
            "INSERT INTO file_hashes (path, hash, mtime) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET hash = excluded.hash, mtime = excluded.mtime",
            params![path_str, hash.as_ref(), mtime],
        )?;

        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let path_str = path.to_string_lossy();

        let removed = conn.execute("DELETE FROM file_hashes WHERE path = ?", [&path_str])?;
        Ok(removed > 0)
    }

    fn record_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM file_hashes", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(count as usize)
    }

    fn prune_orphans(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT path FROM file_hashes")?;
        let paths: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);

        let mut count = 0;
        for path in paths {
            if !Path::new(&path).is_file() {
                conn.execute("DELETE FROM file_hashes WHERE path = ?", [&path])?;
                count += 1;
            }
        }

        if count > 0 {
            info!(removed = count, "Pruned records for missing files");
        }

        Ok(count)
    }
}
