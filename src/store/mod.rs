use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod read;
mod schema;
mod write;

pub use read::MatchOffsets;

/// Busy-wait timeout for contended database operations.
const BUSY_TIMEOUT_MS: u32 = 30_000;

/// Metadata stored for one registered song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Stable identifier derived from the source path.
    pub song_id: String,
    pub artist: String,
    pub album: String,
    pub title: String,
}

/// Errors returned by the index store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not create the parent directory for the database file.
    #[error("Could not write to {path}: {source}")]
    CreateDir {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// SQLite query failed.
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Database stayed locked through the busy timeout and all retries.
    #[error("Database is busy, please retry")]
    Busy,
}

/// Persistent inverted index over `(hash, offset, song_id)` rows plus the
/// song metadata table.
///
/// One writer connection is shared behind the engine's lock; readers open
/// their own read-only connections and never block writers under WAL.
pub struct IndexStore {
    connection: Connection,
}

impl IndexStore {
    /// Open (or create) the index at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let connection = Connection::open(path)?;
        let store = Self { connection };
        store.apply_pragmas()?;
        schema::apply_schema(&store.connection)?;
        Ok(store)
    }

    /// Open an existing index read-only; used by query paths so they never
    /// contend with the writer lock.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let connection = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let store = Self { connection };
        store.apply_read_only_pragmas()?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(&format!(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA busy_timeout={BUSY_TIMEOUT_MS};
                 PRAGMA wal_autocheckpoint=300;
                 PRAGMA temp_store=MEMORY;"
            ))
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn apply_read_only_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(&format!("PRAGMA busy_timeout={BUSY_TIMEOUT_MS};"))
            .map_err(map_sql_error)?;
        Ok(())
    }
}

/// Translate rusqlite errors into friendlier StoreError variants.
pub(crate) fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY
                || sql_err.extended_code == rusqlite::ffi::SQLITE_LOCKED =>
        {
            StoreError::Busy
        }
        other => StoreError::Sql(other),
    }
}
