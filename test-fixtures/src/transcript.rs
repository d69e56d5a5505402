//! Synthetic transcripts for ingestion tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use engram_core::errors::{EngramResult, IngestError};
use engram_core::models::{SessionInfo, Turn, TurnBlock};
use engram_core::traits::ITranscriptSource;

/// Builds an ordered turn list with steadily advancing timestamps.
pub struct TranscriptBuilder {
    session_id: String,
    slug: String,
    start: DateTime<Utc>,
    turns: Vec<Turn>,
}

impl TranscriptBuilder {
    pub fn new(session_id: &str, slug: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            slug: slug.to_string(),
            start: Utc::now() - Duration::hours(1),
            turns: Vec::new(),
        }
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.turns.len() as i64)
    }

    /// One user + assistant exchange on the main conversation.
    pub fn exchange(mut self, user: &str, assistant: &str) -> Self {
        let timestamp = self.next_timestamp();
        self.turns.push(Turn {
            index: self.turns.len() as u32,
            timestamp,
            agent_id: None,
            spawn_depth: 0,
            blocks: vec![
                TurnBlock::User {
                    text: user.to_string(),
                },
                TurnBlock::Assistant {
                    text: assistant.to_string(),
                },
            ],
        });
        self
    }

    /// A turn produced by a named sub-agent at the given depth.
    pub fn sub_agent_turn(mut self, agent_id: &str, depth: u32, text: &str) -> Self {
        let timestamp = self.next_timestamp();
        self.turns.push(Turn {
            index: self.turns.len() as u32,
            timestamp,
            agent_id: Some(agent_id.to_string()),
            spawn_depth: depth,
            blocks: vec![TurnBlock::Assistant {
                text: text.to_string(),
            }],
        });
        self
    }

    /// Append raw blocks as one main-conversation turn.
    pub fn turn_with_blocks(mut self, blocks: Vec<TurnBlock>) -> Self {
        let timestamp = self.next_timestamp();
        self.turns.push(Turn {
            index: self.turns.len() as u32,
            timestamp,
            agent_id: None,
            spawn_depth: 0,
            blocks,
        });
        self
    }

    pub fn build(self) -> (SessionInfo, Vec<Turn>) {
        let end = self
            .turns
            .last()
            .map(|t| t.timestamp)
            .unwrap_or(self.start);
        let info = SessionInfo {
            session_id: self.session_id,
            slug: self.slug,
            cwd: "/work".into(),
            message_count: self.turns.len() * 2,
            start_time: self.start,
            end_time: end,
        };
        (info, self.turns)
    }
}

/// In-memory transcript provider: path → prepared session.
#[derive(Default)]
pub struct StaticTranscriptSource {
    sessions: Mutex<HashMap<PathBuf, (SessionInfo, Vec<Turn>)>>,
}

impl StaticTranscriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: impl Into<PathBuf>, info: SessionInfo, turns: Vec<Turn>) {
        self.sessions
            .lock()
            .expect("fixture lock")
            .insert(path.into(), (info, turns));
    }

    fn lookup<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&(SessionInfo, Vec<Turn>)) -> T,
    ) -> EngramResult<T> {
        let sessions = self.sessions.lock().expect("fixture lock");
        sessions
            .get(path)
            .map(f)
            .ok_or_else(|| {
                IngestError::SessionReadFailed {
                    path: path.display().to_string(),
                    reason: "no such fixture session".into(),
                }
                .into()
            })
    }
}

impl ITranscriptSource for StaticTranscriptSource {
    fn get_session_info(&self, path: &Path) -> EngramResult<SessionInfo> {
        self.lookup(path, |(info, _)| info.clone())
    }

    fn assemble_turns(&self, path: &Path) -> EngramResult<Vec<Turn>> {
        self.lookup(path, |(_, turns)| turns.clone())
    }
}
