/// Retrieval pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("no embedder is loaded")]
    NoEmbedder,

    #[error("vector search failed: {reason}")]
    VectorSearchFailed { reason: String },

    #[error("query exceeded its deadline after {elapsed_ms}ms")]
    QueryTimeout { elapsed_ms: u64 },

    #[error("context assembly failed: {reason}")]
    ContextAssemblyFailed { reason: String },
}

impl RetrievalError {
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::NoEmbedder => "NO_EMBEDDER",
            RetrievalError::VectorSearchFailed { .. } => "VECTOR_SEARCH_FAILED",
            RetrievalError::QueryTimeout { .. } => "QUERY_TIMEOUT",
            RetrievalError::ContextAssemblyFailed { .. } => "CONTEXT_ASSEMBLY_FAILED",
        }
    }
}
