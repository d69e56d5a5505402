//! Typed error taxonomy.
//!
//! Every subsystem has its own thiserror enum; `EngramError` is the
//! umbrella the host sees. Each variant maps to a stable machine-readable
//! code via `code()`, and hosts branch on codes, never on messages. The
//! transient kinds (lock contention, rate limits, connection resets) are
//! the only ones `with_retry` will re-attempt.

mod cluster_error;
mod config_error;
mod ingest_error;
mod retrieval_error;
mod retry;
mod storage_error;

pub use cluster_error::ClusterError;
pub use config_error::ConfigError;
pub use ingest_error::IngestError;
pub use retrieval_error::RetrievalError;
pub use retry::{with_retry, RetryPolicy};
pub use storage_error::StorageError;

/// Result alias used across the workspace.
pub type EngramResult<T> = Result<T, EngramError>;

/// Umbrella error carrying the subsystem taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `with_retry` gave up: every attempt failed with a transient
    /// error. Carries the last one.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
}

impl EngramError {
    /// Stable machine-readable code for host consumption.
    pub fn code(&self) -> &'static str {
        match self {
            EngramError::Storage(e) => e.code(),
            EngramError::Ingest(e) => e.code(),
            EngramError::Retrieval(e) => e.code(),
            EngramError::Cluster(e) => e.code(),
            EngramError::Config(e) => e.code(),
            EngramError::RetryExhausted { .. } => "RETRY_EXHAUSTED",
        }
    }

    /// Whether retrying the failed operation can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EngramError::Storage(StorageError::DbLocked { .. }) => true,
            EngramError::Storage(StorageError::Sqlite { message }) => {
                message.contains("database is locked") || message.contains("busy")
            }
            EngramError::Ingest(IngestError::EmbedFailed { reason }) => {
                reason.contains("rate limit")
                    || reason.contains("connection refused")
                    || reason.contains("connection reset")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err: EngramError = StorageError::DbLocked {
            operation: "insert_chunks".into(),
        }
        .into();
        assert_eq!(err.code(), "DB_LOCKED");

        let err: EngramError = RetrievalError::NoEmbedder.into();
        assert_eq!(err.code(), "NO_EMBEDDER");

        let err: EngramError = ConfigError::MissingRequired {
            field: "db_path".into(),
        }
        .into();
        assert_eq!(err.code(), "MISSING_REQUIRED");

        let err = EngramError::RetryExhausted {
            attempts: 3,
            last_error: "database is locked".into(),
        };
        assert_eq!(err.code(), "RETRY_EXHAUSTED");
        // Exhaustion is final: it must not feed back into the retry loop.
        assert!(!err.is_transient());
    }

    #[test]
    fn lock_errors_are_transient() {
        let err: EngramError = StorageError::DbLocked {
            operation: "x".into(),
        }
        .into();
        assert!(err.is_transient());

        let err: EngramError = StorageError::ChunkNotFound { id: "c1".into() }.into();
        assert!(!err.is_transient());
    }
}
