/// Ingestion pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read session {path}: {reason}")]
    SessionReadFailed { path: String, reason: String },

    #[error("failed to parse transcript: {reason}")]
    ParseFailed { reason: String },

    #[error("chunking failed for session {session_id}: {reason}")]
    ChunkFailed { session_id: String, reason: String },

    #[error("embedding failed: {reason}")]
    EmbedFailed { reason: String },

    #[error("edge detection failed for session {session_id}: {reason}")]
    EdgeDetectionFailed { session_id: String, reason: String },
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::SessionReadFailed { .. } => "SESSION_READ_FAILED",
            IngestError::ParseFailed { .. } => "PARSE_FAILED",
            IngestError::ChunkFailed { .. } => "CHUNK_FAILED",
            IngestError::EmbedFailed { .. } => "EMBED_FAILED",
            IngestError::EdgeDetectionFailed { .. } => "EDGE_DETECTION_FAILED",
        }
    }
}
