/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to open database at {path}: {reason}")]
    DbOpenFailed { path: String, reason: String },

    #[error("database is locked: {operation}")]
    DbLocked { operation: String },

    #[error("chunk not found: {id}")]
    ChunkNotFound { id: String },

    #[error("edge upsert failed: {reason}")]
    EdgeUpsertFailed { reason: String },

    #[error("vector insert failed for chunk {chunk_id}: {reason}")]
    VectorInsertFailed { chunk_id: String, reason: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("archive operation failed: {reason}")]
    ArchiveFailed { reason: String },

    #[error("SQLite error: {message}")]
    Sqlite { message: String },
}

impl StorageError {
    /// Stable machine-readable code for host consumption.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            StorageError::DbLocked { .. } => "DB_LOCKED",
            StorageError::ChunkNotFound { .. } => "CHUNK_NOT_FOUND",
            StorageError::EdgeUpsertFailed { .. } => "EDGE_UPSERT_FAILED",
            StorageError::VectorInsertFailed { .. } => "VECTOR_INSERT_FAILED",
            StorageError::MigrationFailed { .. } => "DB_MIGRATION_FAILED",
            StorageError::ArchiveFailed { .. } => "DB_ARCHIVE_FAILED",
            StorageError::Sqlite { .. } => "DB_ERROR",
        }
    }
}
