//! Engine assembly and the host-facing operations.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use engram_cluster::ClusterManager;
use engram_core::config::EngramConfig;
use engram_core::errors::EngramResult;
use engram_core::models::{
    Cluster, Direction, EpisodicMode, EpisodicRequest, EpisodicResponse, IngestOptions,
    IngestResult, PruneProgress, ReclusterResult, SearchRequest, SearchResponse,
};
use engram_core::traits::{IClusterStore, IEmbedder, IMemoryStore, ISecretStore, ITranscriptSource};
use engram_decay::DecayEngine;
use engram_embeddings::{CachedEmbedder, SharedEmbedder};
use engram_graph::{best_chain, format_narrative, ChainWalker, Pruner, WalkOptions};
use engram_ingest::IngestOrchestrator;
use engram_retrieval::{CancelFlag, SearchAssembler};
use engram_storage::archive::{self, ArchiveOptions, ImportStats};
use engram_storage::keys::KeyMaterial;
use engram_storage::StorageEngine;

/// The assembled engine. One instance per process and database file.
pub struct Engram {
    store: Arc<StorageEngine>,
    shared_embedder: SharedEmbedder,
    assembler: SearchAssembler<StorageEngine>,
    walker: ChainWalker,
    pruner: Arc<Pruner>,
    cluster_manager: ClusterManager<StorageEngine>,
    orchestrator: IngestOrchestrator<StorageEngine>,
    config: EngramConfig,
}

impl Engram {
    /// Open the engine. The embedder is installed into the process-wide
    /// shared handle; the encryption key, when configured, is fetched
    /// from the secret store and held only in a zeroizing buffer.
    pub fn open(
        config: EngramConfig,
        transcripts: Arc<dyn ITranscriptSource>,
        embedder: Arc<dyn IEmbedder>,
        secrets: Option<Arc<dyn ISecretStore>>,
    ) -> EngramResult<Self> {
        config.validate()?;

        let key = match (&config.storage.encryption_key_name, &secrets) {
            (Some(name), Some(store)) => store.get(name)?.map(KeyMaterial::new),
            _ => None,
        };

        let decay = DecayEngine::new(config.decay.clone());
        let store = Arc::new(StorageEngine::open(&config.storage, decay.clone(), key)?);

        let shared_embedder = SharedEmbedder::new();
        shared_embedder.install(embedder);
        let cached = Arc::new(CachedEmbedder::new(
            shared_embedder.clone(),
            store.clone(),
            config.ingest.embedding_cache_max_entries,
        ));

        Ok(Self {
            assembler: SearchAssembler::new(
                store.clone(),
                cached.clone(),
                config.retrieval.clone(),
            ),
            walker: ChainWalker::new(store.clone()),
            pruner: Arc::new(Pruner::new(store.clone(), decay)),
            cluster_manager: ClusterManager::new(store.clone(), config.cluster.clone()),
            orchestrator: IngestOrchestrator::new(
                store.clone(),
                cached,
                transcripts,
                config.ingest.clone(),
            ),
            store,
            shared_embedder,
            config,
        })
    }

    /// Ingest one session transcript.
    pub async fn ingest_session(
        &self,
        path: &Path,
        options: &IngestOptions,
    ) -> EngramResult<IngestResult> {
        self.orchestrator.ingest_session(path, options).await
    }

    /// Hybrid search within the request's token budget.
    pub async fn search(&self, request: &SearchRequest) -> EngramResult<SearchResponse> {
        self.assembler.search(request, &CancelFlag::new()).await
    }

    /// Hybrid search with caller-owned cancellation.
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: &CancelFlag,
    ) -> EngramResult<SearchResponse> {
        self.assembler.search(request, cancel).await
    }

    /// Episodic recall: reconstruct the chronology that led here.
    pub async fn recall(&self, request: &EpisodicRequest) -> EngramResult<EpisodicResponse> {
        self.episodic(request, Direction::Backward).await
    }

    /// Episodic prediction: follow the likely continuation.
    pub async fn predict(&self, request: &EpisodicRequest) -> EngramResult<EpisodicResponse> {
        self.episodic(request, Direction::Forward).await
    }

    async fn episodic(
        &self,
        request: &EpisodicRequest,
        direction: Direction,
    ) -> EngramResult<EpisodicResponse> {
        let started = Instant::now();
        let search_request = SearchRequest {
            query: request.query.clone(),
            project_filter: request.project_filter.clone(),
            agent_filter: request.agent_filter.clone(),
            session_id: request.session_id.clone(),
            token_budget: request.token_budget,
            skip_clusters: false,
        };
        let search = self.assembler.search(&search_request, &CancelFlag::new()).await?;

        let mut options = WalkOptions::new(direction, request.token_budget);
        options.max_depth = self.config.retrieval.max_walk_depth;
        options.max_skipped_consecutive = self.config.retrieval.max_skipped_consecutive;
        options.agent_filter = request.agent_filter.clone();

        let outcome =
            self.walker
                .walk_chains(&search.seed_ids, &search.query_embedding, &options)?;
        if !outcome.dead_edge_ids.is_empty() {
            self.pruner.enqueue(outcome.dead_edge_ids.clone());
        }

        let response = match best_chain(&outcome.chains) {
            Some(chain) => {
                let text = format_narrative(chain, direction);
                let chunk_ids = match direction {
                    Direction::Backward => {
                        chain.chunks.iter().rev().map(|c| c.id.clone()).collect()
                    }
                    Direction::Forward => chain.chunks.iter().map(|c| c.id.clone()).collect(),
                };
                EpisodicResponse {
                    token_count: engram_core::codec::approx_tokens(&text),
                    text,
                    mode: EpisodicMode::Chain,
                    direction,
                    chunk_ids,
                    duration_ms: started.elapsed().as_millis() as u64,
                }
            }
            None => EpisodicResponse {
                text: search.text.clone(),
                token_count: search.token_count,
                mode: EpisodicMode::SearchFallback,
                direction,
                chunk_ids: search.chunks.iter().map(|c| c.chunk.id.clone()).collect(),
                duration_ms: started.elapsed().as_millis() as u64,
            },
        };
        tracing::info!(
            mode = ?response.mode,
            chunks = response.chunk_ids.len(),
            duration_ms = response.duration_ms,
            "episodic retrieval complete"
        );
        Ok(response)
    }

    /// Run a full reclustering pass over the stored vectors.
    pub fn recluster(&self) -> EngramResult<ReclusterResult> {
        self.cluster_manager.recluster()
    }

    /// Start (or observe) the cooperative background prune.
    pub fn start_background_prune(&self) -> PruneProgress {
        self.pruner.start_background_prune()
    }

    /// Current background prune progress.
    pub fn prune_progress(&self) -> PruneProgress {
        self.pruner.progress()
    }

    /// Flush the lazy prune queue immediately.
    pub fn flush_prune_queue(&self) -> EngramResult<usize> {
        self.pruner.flush_now()
    }

    /// Delete chunks whose orphan grace period expired.
    pub fn cleanup_orphans(&self) -> EngramResult<usize> {
        self.store
            .cleanup_expired_orphans(self.config.storage.orphan_ttl_hours, Utc::now())
    }

    /// Clusters in need of an out-of-band label refresh.
    pub fn stale_clusters(&self, max_age_hours: u64) -> EngramResult<Vec<Cluster>> {
        IClusterStore::stale_clusters(self.store.as_ref(), max_age_hours, Utc::now())
    }

    /// Record a refreshed cluster label.
    pub fn set_cluster_label(
        &self,
        cluster_id: &str,
        name: &str,
        description: &str,
    ) -> EngramResult<()> {
        IClusterStore::set_cluster_label(
            self.store.as_ref(),
            cluster_id,
            name,
            description,
            Utc::now(),
        )
    }

    /// Export the store to an archive file.
    pub fn export_archive(&self, path: &Path, options: &ArchiveOptions) -> EngramResult<()> {
        archive::export_archive(&self.store, path, options)
    }

    /// Import an archive file into the store.
    pub fn import_archive(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> EngramResult<ImportStats> {
        archive::import_archive(&self.store, path, password)
    }

    /// Direct storage access for host-side maintenance and tests.
    pub fn store(&self) -> &Arc<StorageEngine> {
        &self.store
    }

    /// Tear down retrieval: dispose the embedder and audit the close.
    /// The engine can no longer serve queries that need embeddings.
    pub fn dispose(&self) {
        self.shared_embedder.dispose();
        self.store.close();
    }
}
