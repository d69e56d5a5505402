//! The ingestion orchestrator.
//!
//! One session in, one atomic commit out: chunks with clocks, cached
//! embeddings, same-session edges. Cross-session continuation lands in
//! a follow-up transaction, then the project clock is persisted.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use engram_core::clock::VectorClock;
use engram_core::config::IngestConfig;
use engram_core::errors::{with_retry, EngramResult, RetryPolicy};
use engram_core::models::{Chunk, IngestOptions, IngestResult, ReferenceType, Turn};
use engram_core::traits::{IMemoryStore, ITranscriptSource};
use engram_embeddings::CachedEmbedder;

use crate::chunking::{self, PendingChunk};
use crate::edges;

pub struct IngestOrchestrator<S> {
    store: Arc<S>,
    embedder: Arc<CachedEmbedder>,
    transcripts: Arc<dyn ITranscriptSource>,
    config: IngestConfig,
    retry: RetryPolicy,
}

impl<S> IngestOrchestrator<S>
where
    S: IMemoryStore + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        embedder: Arc<CachedEmbedder>,
        transcripts: Arc<dyn ITranscriptSource>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            transcripts,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Ingest one session transcript.
    pub async fn ingest_session(
        &self,
        path: &Path,
        options: &IngestOptions,
    ) -> EngramResult<IngestResult> {
        let started = Instant::now();
        let info = self.transcripts.get_session_info(path)?;

        if options.skip_if_exists && self.store.is_session_ingested(&info.session_id)? {
            tracing::debug!(session = %info.session_id, "session already ingested, skipping");
            return Ok(IngestResult {
                session_id: info.session_id,
                skipped: true,
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        let turns = self.transcripts.assemble_turns(path)?;
        let pending = chunking::chunk_turns(&turns, options);
        if pending.is_empty() {
            return Ok(IngestResult {
                session_id: info.session_id,
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        // Clock stamping: thread the project clock through the turns,
        // ticking each acting agent; a chunk carries the state after
        // its last covered turn.
        let base_clock = self.store.project_clock(&info.slug)?;
        let (chunks, final_clock) =
            materialize_chunks(&pending, &turns, &info.session_id, &info.slug, base_clock);

        // Embed through the cache; misses batch through the model.
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed_documents(&texts, self.config.embed_batch_size)?;
        let vectors: Vec<(String, Vec<f32>)> = chunks
            .iter()
            .zip(embeddings.into_iter())
            .map(|(chunk, vector)| (chunk.id.clone(), vector))
            .collect();

        let session_edges = edges::detect_session_edges(&chunks);
        let sub_agent_edges = session_edges
            .iter()
            .filter(|e| {
                matches!(
                    e.reference_type,
                    Some(ReferenceType::SubagentBrief) | Some(ReferenceType::SubagentDebrief)
                )
            })
            .count();

        // Find the continuation target before the new chunks land.
        let previous_tail = self
            .store
            .latest_project_chunk(&info.slug, Some(&info.session_id))?;

        // The atomic ingest transaction.
        let store = Arc::clone(&self.store);
        let stats = with_retry(self.retry, || {
            let store = Arc::clone(&store);
            let chunks = chunks.clone();
            let vectors = vectors.clone();
            let session_edges = session_edges.clone();
            async move { store.ingest_transaction(&chunks, &vectors, &session_edges) }
        })
        .await?;

        // Cross-session continuation is a follow-up transaction.
        let mut cross_session_edges = 0;
        if let Some(tail) = previous_tail {
            let edge = edges::cross_session_edge(&tail, &chunks[0]);
            let upsert = self.store.create_or_boost_edges(&[edge])?;
            cross_session_edges = upsert.inserted + upsert.boosted;
        }

        self.store.save_project_clock(&info.slug, &final_clock)?;

        let result = IngestResult {
            session_id: info.session_id,
            chunk_count: chunks.len(),
            edge_count: stats.inserted + cross_session_edges,
            cross_session_edges,
            sub_agent_edges,
            skipped: false,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            session = %result.session_id,
            chunks = result.chunk_count,
            edges = result.edge_count,
            duration_ms = result.duration_ms,
            "session ingested"
        );
        Ok(result)
    }
}

/// Attach ids and clocks to pending chunks. Per turn, the human and the
/// main agent tick on an exchange; a sub-agent turn ticks its own
/// agent, with the clock inherited from the parent on first sight.
fn materialize_chunks(
    pending: &[PendingChunk],
    turns: &[Turn],
    session_id: &str,
    project_slug: &str,
    base_clock: VectorClock,
) -> (Vec<Chunk>, VectorClock) {
    let mut clock = base_clock;
    let now = Utc::now();
    let mut chunks = Vec::with_capacity(pending.len());
    // Split pieces of one oversized turn share turn indices; each turn
    // ticks the clock once.
    let mut ticked = std::collections::HashSet::new();

    for p in pending {
        for &turn_index in &p.turn_indices {
            if !ticked.insert(turn_index) {
                continue;
            }
            let Some(turn) = turns.iter().find(|t| t.index == turn_index) else {
                continue;
            };
            match &turn.agent_id {
                Some(agent) => {
                    if clock.get(agent) == 0 {
                        clock = clock.spawn(agent);
                    }
                    clock = clock.tick(agent);
                }
                None => {
                    clock = clock.tick("human").tick("ui");
                }
            }
        }
        chunks.push(Chunk {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            project_slug: project_slug.to_string(),
            turn_indices: p.turn_indices.clone(),
            start_time: p.start_time,
            end_time: p.end_time,
            content: p.text.clone(),
            code_block_count: p.code_block_count,
            tool_use_count: p.tool_use_count,
            approx_tokens: engram_core::codec::approx_tokens(&p.text) as u32,
            created_at: now,
            agent_id: p.agent_id.clone(),
            vector_clock: Some(clock.clone()),
            spawn_depth: p.spawn_depth,
        });
    }
    (chunks, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::Direction;
    use engram_core::traits::IMemoryStore;
    use engram_embeddings::SharedEmbedder;
    use engram_storage::StorageEngine;
    use test_fixtures::{HashEmbedder, StaticTranscriptSource, TranscriptBuilder};

    fn harness() -> (
        Arc<StorageEngine>,
        Arc<StaticTranscriptSource>,
        IngestOrchestrator<StorageEngine>,
    ) {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let shared = SharedEmbedder::new();
        shared.install(Arc::new(HashEmbedder::new(16)));
        let embedder = Arc::new(CachedEmbedder::new(shared, store.clone(), 1_000));
        let transcripts = Arc::new(StaticTranscriptSource::new());
        let orchestrator = IngestOrchestrator::new(
            store.clone(),
            embedder,
            transcripts.clone(),
            IngestConfig::default(),
        );
        (store, transcripts, orchestrator)
    }

    fn body() -> String {
        "a sentence that easily clears the merge threshold ".repeat(10)
    }

    #[tokio::test]
    async fn two_turn_session_round_trip() {
        let (store, transcripts, orchestrator) = harness();
        let (info, turns) = TranscriptBuilder::new("sess-1", "proj")
            .exchange(
                "How do I read a file in Node.js?",
                "Use fs.readFile:\n```js\nfs.readFile(path, cb)\n```",
            )
            .build();
        transcripts.add("/t/s1", info, turns);

        let result = orchestrator
            .ingest_session(Path::new("/t/s1"), &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(result.chunk_count, 1);
        assert_eq!(result.edge_count, 0);
        assert!(!result.skipped);

        let chunks = store.session_chunks("sess-1").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].code_block_count, 1);
        assert!(store.get_vector(&chunks[0].id).unwrap().is_some());
        // One exchange: human and ui each ticked once.
        let clock = store.project_clock("proj").unwrap();
        assert_eq!(clock.get("human"), 1);
        assert_eq!(clock.get("ui"), 1);
    }

    #[tokio::test]
    async fn four_turn_session_links_adjacent_chunks() {
        let (store, transcripts, orchestrator) = harness();
        let (info, turns) = TranscriptBuilder::new("sess-adj", "proj")
            .exchange("one", &body())
            .exchange("two", &body())
            .exchange("three", &body())
            .exchange("four", &body())
            .build();
        transcripts.add("/t/adj", info, turns);

        let result = orchestrator
            .ingest_session(Path::new("/t/adj"), &IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(result.chunk_count, 4);
        assert_eq!(result.edge_count, 3);

        let chunks = store.session_chunks("sess-adj").unwrap();
        let clock = store.project_clock("proj").unwrap();
        let set = store
            .weighted_edges(&chunks[0].id, Direction::Forward, &clock)
            .unwrap();
        assert_eq!(set.live.len(), 1);
        assert_eq!(
            set.live[0].edge.reference_type,
            Some(ReferenceType::Adjacent)
        );
        assert_eq!(set.live[0].edge.initial_weight, 1.0);
    }

    #[tokio::test]
    async fn reingest_with_skip_is_idempotent() {
        let (store, transcripts, orchestrator) = harness();
        let (info, turns) = TranscriptBuilder::new("sess-dup", "proj")
            .exchange("one", &body())
            .exchange("two", &body())
            .build();
        transcripts.add("/t/dup", info, turns);

        let first = orchestrator
            .ingest_session(Path::new("/t/dup"), &IngestOptions::default())
            .await
            .unwrap();
        let second = orchestrator
            .ingest_session(Path::new("/t/dup"), &IngestOptions::default())
            .await
            .unwrap();

        assert!(!first.skipped);
        assert!(second.skipped);
        assert_eq!(second.chunk_count, 0);
        assert_eq!(store.session_chunks("sess-dup").unwrap().len(), first.chunk_count);
        assert_eq!(store.edge_count().unwrap(), first.edge_count);
    }

    #[tokio::test]
    async fn spawn_and_debrief_merge_clocks() {
        let (store, transcripts, orchestrator) = harness();
        // Five parent exchanges, a three-turn sub-agent, one debrief
        // exchange.
        let mut builder = TranscriptBuilder::new("sess-sub", "proj");
        for i in 0..5 {
            builder = builder.exchange(&format!("q{i}"), &body());
        }
        for _ in 0..3 {
            builder = builder.sub_agent_turn("a1", 1, &body());
        }
        builder = builder.exchange("debrief", &body());
        let (info, turns) = builder.build();
        transcripts.add("/t/sub", info, turns);

        let result = orchestrator
            .ingest_session(Path::new("/t/sub"), &IngestOptions::default())
            .await
            .unwrap();

        // brief (parent → sub) + debrief (sub → parent).
        assert_eq!(result.sub_agent_edges, 2);

        let clock = store.project_clock("proj").unwrap();
        assert_eq!(clock.get("ui"), 6);
        assert_eq!(clock.get("human"), 6);
        assert_eq!(clock.get("a1"), 3);

        // Exactly one brief and one debrief edge with the right
        // endpoints.
        let chunks = store.session_chunks("sess-sub").unwrap();
        let sub_chunks: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.agent_id.as_deref() == Some("a1"))
            .collect();
        assert!(!sub_chunks.is_empty());
        let first_sub = sub_chunks.first().unwrap();
        let incoming = store
            .weighted_edges(&first_sub.id, Direction::Backward, &clock)
            .unwrap();
        assert!(incoming
            .live
            .iter()
            .any(|w| w.edge.reference_type == Some(ReferenceType::SubagentBrief)));
    }

    #[tokio::test]
    async fn second_session_gets_a_cross_session_edge() {
        let (store, transcripts, orchestrator) = harness();
        let (info1, turns1) = TranscriptBuilder::new("sess-a", "proj")
            .exchange("first session", &body())
            .build();
        transcripts.add("/t/a", info1, turns1);
        let (info2, turns2) = TranscriptBuilder::new("sess-b", "proj")
            .exchange("second session", &body())
            .build();
        transcripts.add("/t/b", info2, turns2);

        orchestrator
            .ingest_session(Path::new("/t/a"), &IngestOptions::default())
            .await
            .unwrap();
        let second = orchestrator
            .ingest_session(Path::new("/t/b"), &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(second.cross_session_edges, 1);
        let head = &store.session_chunks("sess-b").unwrap()[0];
        let clock = store.project_clock("proj").unwrap();
        let incoming = store
            .weighted_edges(&head.id, Direction::Backward, &clock)
            .unwrap();
        assert!(incoming
            .live
            .iter()
            .any(|w| w.edge.reference_type == Some(ReferenceType::CrossSession)));
    }
}
