//! # engram
//!
//! The assembled episodic memory engine. A host process hands over a
//! transcript provider, an embedding model, and optionally a secret
//! store; the engine owns storage, caching, clustering, pruning, and
//! retrieval behind a narrow API:
//!
//! - [`Engram::ingest_session`] — parse, chunk, embed, link, commit
//! - [`Engram::search`] — hybrid retrieval within a token budget
//! - [`Engram::recall`] / [`Engram::predict`] — episodic chains
//! - [`Engram::recluster`] — refresh the density clusters
//! - [`Engram::start_background_prune`] — sweep dead edges

mod engine;

pub use engine::Engram;

pub use engram_core::config::EngramConfig;
pub use engram_core::errors::{EngramError, EngramResult};
pub use engram_core::models::{
    EpisodicMode, EpisodicRequest, EpisodicResponse, IngestOptions, IngestResult, PruneProgress,
    ReclusterResult, SearchRequest, SearchResponse,
};
pub use engram_core::traits::{IEmbedder, ISecretStore, ITranscriptSource};
pub use engram_retrieval::CancelFlag;
pub use engram_storage::archive::{ArchiveOptions, ImportStats};
