//! # engram-storage
//!
//! SQLite persistence for the chunk graph. One write connection, a small
//! read pool under WAL, numbered migrations, and query modules per
//! table family. The engine implements the core storage traits so the
//! layers above never see rusqlite.

pub mod archive;
pub mod audit;
pub mod engine;
pub mod keys;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use engram_core::errors::{EngramError, StorageError};

/// Map an underlying SQLite failure onto the storage taxonomy, keeping
/// lock/busy conditions distinguishable for the retry layer.
pub(crate) fn to_storage_err(message: String) -> EngramError {
    if message.contains("database is locked") || message.contains("busy") {
        EngramError::Storage(StorageError::DbLocked { operation: message })
    } else {
        EngramError::Storage(StorageError::Sqlite { message })
    }
}
