use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session metadata supplied by the transcript provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    /// Project slug, disambiguated across workspaces.
    pub slug: String,
    /// Working directory the session ran in.
    pub cwd: String,
    pub message_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// One block inside an assembled turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnBlock {
    User { text: String },
    Assistant { text: String },
    Thinking { text: String },
    ToolUse { name: String, input: String },
    ToolResult { name: String, output: String },
}

/// One user-prompt + assistant-response exchange, including tool
/// round-trips and thinking blocks, as assembled by the transcript
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Position in the session, 0-based, strictly increasing.
    pub index: u32,
    pub timestamp: DateTime<Utc>,
    /// Producing agent; None means the main conversation.
    pub agent_id: Option<String>,
    /// 0 = main conversation; increments per nested sub-agent.
    pub spawn_depth: u32,
    pub blocks: Vec<TurnBlock>,
}

impl Turn {
    /// Whether any block is a tool invocation.
    pub fn has_tool_use(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, TurnBlock::ToolUse { .. }))
    }
}
