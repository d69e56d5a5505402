use std::path::Path;

use crate::errors::EngramResult;
use crate::models::{SessionInfo, Turn};

/// Transcript provider: parses session files into ordered turns.
///
/// Parsing lives outside the engine; chunking the assembled turns is the
/// engine's job.
pub trait ITranscriptSource: Send + Sync {
    /// Session metadata without reading the full message stream.
    fn get_session_info(&self, path: &Path) -> EngramResult<SessionInfo>;

    /// Read and assemble the session's messages into ordered turns,
    /// including tool exchanges and thinking blocks.
    fn assemble_turns(&self, path: &Path) -> EngramResult<Vec<Turn>>;
}
