/// Engram engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RRF smoothing constant. Higher values flatten the contribution of
/// top-ranked items from any single list.
pub const DEFAULT_RRF_K: u32 = 60;

/// Relative weight of vector search results in hybrid fusion.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.7;

/// Relative weight of keyword (BM25) search results in hybrid fusion.
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 0.3;

/// Candidates fetched from vector search before fusion.
pub const DEFAULT_VECTOR_TOP_N: usize = 20;

/// Candidates fetched from keyword search before fusion.
pub const DEFAULT_KEYWORD_TOP_M: usize = 20;

/// Distinct clusters consulted during cluster expansion.
pub const DEFAULT_MAX_CLUSTERS: usize = 3;

/// Additional sibling chunks pulled in per cluster.
pub const DEFAULT_MAX_SIBLINGS: usize = 5;

/// MMR relevance/diversity trade-off.
pub const DEFAULT_MMR_LAMBDA: f64 = 0.7;

/// Recency boost magnitude.
pub const DEFAULT_RECENCY_DECAY_FACTOR: f64 = 0.3;

/// Recency boost half-life in hours (one week).
pub const DEFAULT_RECENCY_HALF_LIFE_HOURS: f64 = 168.0;

/// Multiplier applied to chunks from the caller's current session.
pub const SESSION_BOOST: f64 = 1.2;

/// Top-ranked chunks handed to the chain walker as seeds.
pub const DEFAULT_SEED_COUNT: usize = 5;

/// Maximum hops per chain walk.
pub const DEFAULT_MAX_WALK_DEPTH: usize = 50;

/// Consecutive agent-filtered skips before a chain is abandoned.
pub const DEFAULT_MAX_SKIPPED_CONSECUTIVE: usize = 5;

/// Backward (recall) decay: linear rate per hop.
pub const BACKWARD_DECAY_RATE: f64 = 0.1;

/// Forward (predict) decay: hops at full weight before decay starts.
pub const FORWARD_DECAY_HOLD_HOPS: f64 = 5.0;

/// Forward (predict) decay: linear rate per hop after the hold.
pub const FORWARD_DECAY_RATE: f64 = 0.067;

/// Effective weight floor below which an edge is considered dead.
pub const DEFAULT_MIN_EDGE_WEIGHT: f64 = 0.01;

/// Read-time boost factor per natural-log unit of link_count.
pub const LINK_COUNT_BOOST_FACTOR: f64 = 0.1;

/// Hours of wall-clock age treated as one hop for clockless edges.
pub const DEFAULT_HOURS_PER_HOP: f64 = 24.0;

/// Debounce interval for lazy pruner flushes, in milliseconds.
pub const PRUNE_FLUSH_DEBOUNCE_MS: u64 = 1_000;

/// Edges scanned between cooperative yields during a full prune.
pub const PRUNE_SCAN_YIELD_EVERY: usize = 500;

/// Hours an orphaned chunk survives before TTL cleanup removes it.
pub const DEFAULT_ORPHAN_TTL_HOURS: u64 = 24 * 7;

/// Default HDBSCAN minimum cluster size.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 4;

/// Exemplars stored per cluster.
pub const CLUSTER_EXEMPLAR_COUNT: usize = 3;

/// Chunk merge threshold: turns below this are merged with neighbours.
pub const DEFAULT_MIN_TOKENS_PER_CHUNK: usize = 64;

/// Chunk split threshold.
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 512;

/// Texts per embedder batch. Small to bound attention memory.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 4;

/// Maximum rows retained in the persistent embedding cache.
pub const DEFAULT_EMBEDDING_CACHE_MAX_ENTRIES: usize = 50_000;

/// Token budget slack allowed before truncating assembled context.
pub const ASSEMBLY_TOKEN_SLACK: usize = 100;

/// Default token budget for assembled context.
pub const DEFAULT_TOKEN_BUDGET: usize = 2_000;

/// Retry: maximum attempts for transient failures.
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Retry: initial backoff delay in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 100;

/// Retry: backoff cap in milliseconds.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Approximate characters per token used for budget math.
pub const CHARS_PER_TOKEN: usize = 4;

/// Clusters older than this many hours count as stale for label refresh.
pub const DEFAULT_CLUSTER_STALE_HOURS: u64 = 24;
