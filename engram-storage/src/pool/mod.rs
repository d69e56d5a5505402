//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use engram_core::errors::EngramResult;

use crate::keys::KeyMaterial;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Manages the single write connection and the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file.
    pub fn open(
        path: &Path,
        read_pool_size: usize,
        key: Option<&KeyMaterial>,
    ) -> EngramResult<Self> {
        let writer = WriteConnection::open(path, key)?;
        let readers = ReadPool::open(path, read_pool_size, key)?;
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory pool (for testing). Reads route through the
    /// writer: separate in-memory connections would be isolated
    /// databases.
    pub fn open_in_memory() -> EngramResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        Ok(Self {
            writer,
            readers: None,
            db_path: None,
        })
    }

    /// Execute a read-only query on the best available connection.
    pub fn with_reader<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> EngramResult<T>,
    {
        match &self.readers {
            Some(pool) => pool.with_conn(f),
            None => self.writer.with_conn_sync(f),
        }
    }
}
