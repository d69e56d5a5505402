//! Stage-level cancellation for the retrieval pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use engram_core::errors::{EngramResult, RetrievalError};

/// A cooperative cancellation flag checked between pipeline stages.
/// Cancelling mid-stage discards that stage's output: the pipeline
/// returns `QUERY_TIMEOUT` instead of a partial response.
#[derive(Clone)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail the pipeline when cancelled.
    pub fn check(&self, started: Instant) -> EngramResult<()> {
        if self.is_cancelled() {
            return Err(RetrievalError::QueryTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}
