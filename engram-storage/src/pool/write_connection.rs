//! The single write connection. All mutations are serialized through it.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use engram_core::errors::{EngramResult, StorageError};

use super::pragmas::apply_pragmas;
use crate::keys::KeyMaterial;
use crate::to_storage_err;

/// Owns the writer. Short transactions only; readers go to the pool.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open the write connection for the given database file.
    pub fn open(path: &Path, key: Option<&KeyMaterial>) -> EngramResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            StorageError::DbOpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        if let Some(key) = key {
            key.apply(&conn)?;
        }
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory write connection (for testing).
    pub fn open_in_memory() -> EngramResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::DbOpenFailed {
            path: ":memory:".into(),
            reason: e.to_string(),
        })?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure against the writer.
    pub fn with_conn_sync<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("write connection lock poisoned: {e}")))?;
        f(&guard)
    }
}
