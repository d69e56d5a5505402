//! Edge pruner.
//!
//! Lazy mode: edge reads enqueue dead edge ids; a debounced flush
//! deletes them and marks chunks whose last edge went away as orphaned.
//! Full mode: a cooperative background scan walks every edge, deleting
//! the dead ones under the current project clocks, yielding regularly so
//! it never monopolizes the runtime. Chunks themselves are never
//! deleted here; the orphan TTL cleanup owns that.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;

use engram_core::constants::{PRUNE_FLUSH_DEBOUNCE_MS, PRUNE_SCAN_YIELD_EVERY};
use engram_core::errors::EngramResult;
use engram_core::models::{Direction, Edge, EdgeType, PruneProgress, PruneStatus};
use engram_core::traits::IMemoryStore;
use engram_decay::DecayEngine;

/// Traversal direction on which an edge's own decay is judged.
fn native_direction(edge_type: EdgeType) -> Direction {
    match edge_type {
        EdgeType::Backward => Direction::Backward,
        EdgeType::Forward => Direction::Forward,
    }
}

pub struct Pruner {
    store: Arc<dyn IMemoryStore>,
    decay: DecayEngine,
    queue: Mutex<HashSet<String>>,
    flush_scheduled: AtomicBool,
    debounce: Duration,
    progress: RwLock<PruneProgress>,
    scan_running: AtomicBool,
}

impl Pruner {
    pub fn new(store: Arc<dyn IMemoryStore>, decay: DecayEngine) -> Self {
        Self {
            store,
            decay,
            queue: Mutex::new(HashSet::new()),
            flush_scheduled: AtomicBool::new(false),
            debounce: Duration::from_millis(PRUNE_FLUSH_DEBOUNCE_MS),
            progress: RwLock::new(PruneProgress::default()),
            scan_running: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Enqueue dead edge ids observed by a read. Idempotent under
    /// concurrent enqueues; the debounced flush drains the set.
    pub fn enqueue(self: &Arc<Self>, ids: impl IntoIterator<Item = String>) {
        {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.extend(ids);
            if queue.is_empty() {
                return;
            }
        }
        if self
            .flush_scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let pruner = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(pruner.debounce).await;
                pruner.flush_scheduled.store(false, Ordering::SeqCst);
                if let Err(e) = pruner.flush_now() {
                    tracing::warn!(error = %e, "lazy prune flush failed");
                }
            });
        }
    }

    /// Drain the queue immediately: delete the edges, then orphan-mark
    /// any endpoint chunk left without edges.
    pub fn flush_now(&self) -> EngramResult<usize> {
        let ids: Vec<String> = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.drain().collect()
        };
        if ids.is_empty() {
            return Ok(0);
        }

        let doomed = self.store.get_edges(&ids)?;
        let deleted = self.store.delete_edges(&ids)?;
        self.orphan_check(&doomed)?;
        tracing::debug!(deleted, "lazy prune flush complete");
        Ok(deleted)
    }

    /// Orphan-mark endpoints of deleted edges that lost their last
    /// edge. Returns (chunks scanned, chunks orphaned).
    fn orphan_check(&self, deleted: &[Edge]) -> EngramResult<(usize, usize)> {
        let mut endpoints = HashSet::new();
        for edge in deleted {
            endpoints.insert(edge.source_chunk_id.clone());
            endpoints.insert(edge.target_chunk_id.clone());
        }
        let scanned = endpoints.len();
        let mut orphaned = 0;
        let now = Utc::now();
        for chunk_id in endpoints {
            if !self.store.chunk_has_edges(&chunk_id)? {
                self.store.mark_vector_orphaned(&chunk_id, now)?;
                orphaned += 1;
            }
        }
        Ok((scanned, orphaned))
    }

    /// Snapshot of the background prune progress.
    pub fn progress(&self) -> PruneProgress {
        self.progress
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Start the full background prune. Idempotent: when a scan is
    /// already running, the existing progress is returned and no second
    /// scan starts.
    pub fn start_background_prune(self: &Arc<Self>) -> PruneProgress {
        if self
            .scan_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return self.progress();
        }

        {
            let mut progress = self.progress.write().unwrap_or_else(|e| e.into_inner());
            *progress = PruneProgress {
                status: PruneStatus::Running,
                started_at: Some(Utc::now()),
                ..Default::default()
            };
        }

        let pruner = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = pruner.run_full_scan().await;
            let mut progress = pruner.progress.write().unwrap_or_else(|e| e.into_inner());
            progress.completed_at = Some(Utc::now());
            match outcome {
                Ok(()) => progress.status = PruneStatus::Completed,
                Err(e) => {
                    progress.status = PruneStatus::Failed;
                    progress.error = Some(e.to_string());
                    tracing::warn!(error = %e, "background prune failed");
                }
            }
            pruner.scan_running.store(false, Ordering::SeqCst);
        });
        self.progress()
    }

    /// The cooperative scan, yielding every `PRUNE_SCAN_YIELD_EVERY`
    /// edges.
    async fn run_full_scan(&self) -> EngramResult<()> {
        let now = Utc::now();
        let mut after: Option<String> = None;
        let mut since_yield = 0usize;
        let mut dead: Vec<Edge> = Vec::new();

        loop {
            let batch = self.store.edge_batch(after.as_deref(), 500)?;
            if batch.is_empty() {
                break;
            }
            after = batch.last().map(|e| e.id.clone());

            for edge in batch {
                // Judge against the clock of the project the edge lives
                // in; its source chunk carries the slug.
                let ref_clock = match self.store.get_chunk(&edge.source_chunk_id)? {
                    Some(chunk) => self.store.project_clock(&chunk.project_slug)?,
                    None => Default::default(),
                };
                let weight = self.decay.boosted_weight(
                    &edge,
                    native_direction(edge.edge_type),
                    &ref_clock,
                    now,
                );
                {
                    let mut progress =
                        self.progress.write().unwrap_or_else(|e| e.into_inner());
                    progress.edges_scanned += 1;
                }
                if weight <= 0.0 {
                    dead.push(edge);
                }

                since_yield += 1;
                if since_yield >= PRUNE_SCAN_YIELD_EVERY {
                    since_yield = 0;
                    tokio::task::yield_now().await;
                }
            }
        }

        let dead_ids: Vec<String> = dead.iter().map(|e| e.id.clone()).collect();
        let deleted = self.store.delete_edges(&dead_ids)?;
        let (scanned, orphaned) = self.orphan_check(&dead)?;

        let mut progress = self.progress.write().unwrap_or_else(|e| e.into_inner());
        progress.edges_deleted = deleted;
        progress.chunks_scanned = scanned;
        progress.chunks_orphaned = orphaned;
        tracing::info!(
            scanned = progress.edges_scanned,
            deleted,
            orphaned,
            "background prune complete"
        );
        Ok(())
    }
}
