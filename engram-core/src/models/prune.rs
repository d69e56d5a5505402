use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a background prune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Progress record of the full background prune. Cheap to clone; readers
/// poll a shared handle while the scan runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneProgress {
    pub status: PruneStatus,
    pub edges_scanned: usize,
    pub edges_deleted: usize,
    pub chunks_scanned: usize,
    pub chunks_orphaned: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Default for PruneProgress {
    fn default() -> Self {
        Self {
            status: PruneStatus::Idle,
            edges_scanned: 0,
            edges_deleted: 0,
            chunks_scanned: 0,
            chunks_orphaned: 0,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}
