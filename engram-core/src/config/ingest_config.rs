use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{ConfigError, EngramResult};

/// Ingestion subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_tokens_per_chunk: usize,
    pub min_tokens_per_chunk: usize,
    pub include_thinking: bool,
    /// Texts per embedder batch.
    pub embed_batch_size: usize,
    /// Rows retained in the persistent embedding cache.
    pub embedding_cache_max_entries: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: constants::DEFAULT_MAX_TOKENS_PER_CHUNK,
            min_tokens_per_chunk: constants::DEFAULT_MIN_TOKENS_PER_CHUNK,
            include_thinking: false,
            embed_batch_size: constants::DEFAULT_EMBED_BATCH_SIZE,
            embedding_cache_max_entries: constants::DEFAULT_EMBEDDING_CACHE_MAX_ENTRIES,
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> EngramResult<()> {
        if self.max_tokens_per_chunk == 0 || self.embed_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ingest.max_tokens_per_chunk".into(),
                reason: "chunk and batch sizes must be positive".into(),
            }
            .into());
        }
        if self.min_tokens_per_chunk >= self.max_tokens_per_chunk {
            return Err(ConfigError::InvalidValue {
                field: "ingest.min_tokens_per_chunk".into(),
                reason: "must be below max_tokens_per_chunk".into(),
            }
            .into());
        }
        Ok(())
    }
}
