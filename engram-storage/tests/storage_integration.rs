//! End-to-end storage behavior on a real database file.

use chrono::Utc;
use engram_core::clock::VectorClock;
use engram_core::models::{
    Chunk, Direction, Edge, EdgeType, ReferenceType, SearchFilter,
};
use engram_core::traits::{IEmbeddingCacheStore, IMemoryStore};
use engram_storage::archive::{export_archive, import_archive, ArchiveOptions};
use engram_storage::StorageEngine;

fn chunk(id: &str, project: &str, content: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        session_id: format!("session-{project}"),
        project_slug: project.to_string(),
        turn_indices: vec![0, 1],
        start_time: Utc::now(),
        end_time: Utc::now(),
        content: content.to_string(),
        code_block_count: 0,
        tool_use_count: 0,
        approx_tokens: (content.len() / 4) as u32,
        created_at: Utc::now(),
        agent_id: Some("ui".into()),
        vector_clock: Some(VectorClock::new().tick("ui")),
        spawn_depth: 0,
    }
}

fn edge(id: &str, source: &str, target: &str, clock: VectorClock) -> Edge {
    Edge {
        id: id.to_string(),
        source_chunk_id: source.to_string(),
        target_chunk_id: target.to_string(),
        edge_type: EdgeType::Forward,
        reference_type: Some(ReferenceType::Adjacent),
        initial_weight: 1.0,
        created_at: Utc::now(),
        vector_clock: Some(clock),
        link_count: 1,
    }
}

#[test]
fn ingest_transaction_is_atomic_and_visible() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let chunks = vec![
        chunk("c1", "alpha", "how do I read a file in Node.js"),
        chunk("c2", "alpha", "use fs.readFile with a callback"),
    ];
    let vectors = vec![
        ("c1".to_string(), vec![1.0, 0.0]),
        ("c2".to_string(), vec![0.0, 1.0]),
    ];
    let edges = vec![edge("e1", "c1", "c2", VectorClock::new().tick("ui"))];

    let stats = engine.ingest_transaction(&chunks, &vectors, &edges).unwrap();
    assert_eq!(stats.inserted, 1);
    assert!(engine.is_session_ingested("session-alpha").unwrap());
    assert_eq!(engine.session_chunks("session-alpha").unwrap().len(), 2);
    assert!(engine.get_vector("c1").unwrap().is_some());
}

#[test]
fn keyword_search_uses_porter_stemming() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine
        .insert_chunks(&[
            chunk("c1", "alpha", "the user wants authentication for the API"),
            chunk("c2", "alpha", "we talked about pancakes"),
        ])
        .unwrap();

    // "authenticating" stems to the same term as "authentication".
    let hits = engine
        .search_keyword("authenticating", 10, &SearchFilter::default())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "c1");
    assert!(hits[0].1 > 0.0, "score must be positive, got {}", hits[0].1);
}

#[test]
fn keyword_search_survives_hostile_queries() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine
        .insert_chunks(&[chunk("c1", "alpha", "plain text content")])
        .unwrap();

    for hostile in [
        "\"unbalanced",
        "AND OR NOT",
        "star* (group) {brace}",
        "-leading -dash",
    ] {
        // Must not error, whatever it matches.
        engine
            .search_keyword(hostile, 10, &SearchFilter::default())
            .unwrap();
    }
}

#[test]
fn vector_search_respects_project_and_agent_filters() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let mut a = chunk("a", "alpha", "alpha content");
    a.agent_id = Some("ui".into());
    let mut b = chunk("b", "beta", "beta content");
    b.agent_id = Some("a1".into());
    engine.insert_chunks(&[a, b]).unwrap();
    engine.insert_vector("a", "alpha", &[1.0, 0.0]).unwrap();
    engine.insert_vector("b", "beta", &[1.0, 0.0]).unwrap();

    let all = engine
        .search_vectors(&[1.0, 0.0], 10, &SearchFilter::default())
        .unwrap();
    assert_eq!(all.len(), 2);

    let alpha_only = engine
        .search_vectors(&[1.0, 0.0], 10, &SearchFilter::for_project("alpha"))
        .unwrap();
    assert_eq!(alpha_only.len(), 1);
    assert_eq!(alpha_only[0].0, "a");

    let filter = SearchFilter {
        projects: vec![],
        agent_id: Some("a1".into()),
    };
    let agent_only = engine.search_vectors(&[1.0, 0.0], 10, &filter).unwrap();
    assert_eq!(agent_only.len(), 1);
    assert_eq!(agent_only[0].0, "b");
}

#[test]
fn dead_edges_are_omitted_and_reported() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine
        .insert_chunks(&[chunk("c1", "alpha", "one"), chunk("c2", "alpha", "two")])
        .unwrap();
    // Edge born at the empty clock.
    engine
        .create_or_boost_edges(&[edge("e1", "c1", "c2", VectorClock::new())])
        .unwrap();

    // Eleven hops later a backward-decayed edge is dead.
    let mut clock = VectorClock::new();
    for _ in 0..11 {
        clock = clock.tick("ui");
    }
    let set = engine.weighted_edges("c2", Direction::Backward, &clock).unwrap();
    assert!(set.live.is_empty());
    assert_eq!(set.dead_ids, vec!["e1".to_string()]);

    // Forward decay holds longer: the same edge still lives at 5 hops.
    let mut five = VectorClock::new();
    for _ in 0..5 {
        five = five.tick("ui");
    }
    let set = engine.weighted_edges("c1", Direction::Forward, &five).unwrap();
    assert_eq!(set.live.len(), 1);
}

#[test]
fn orphan_ttl_cleanup_removes_vector_and_chunk() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine
        .insert_chunks(&[chunk("c1", "alpha", "soon gone")])
        .unwrap();
    engine.insert_vector("c1", "alpha", &[1.0]).unwrap();

    let two_weeks_ago = Utc::now() - chrono::Duration::hours(24 * 14);
    engine.mark_vector_orphaned("c1", two_weeks_ago).unwrap();

    let removed = engine.cleanup_expired_orphans(24 * 7, Utc::now()).unwrap();
    assert_eq!(removed, 1);
    assert!(engine.get_chunk("c1").unwrap().is_none());
    assert!(engine.get_vector("c1").unwrap().is_none());
}

#[test]
fn project_clock_roundtrip_and_cache_coherence() {
    let engine = StorageEngine::open_in_memory().unwrap();
    assert!(engine.project_clock("alpha").unwrap().is_empty());

    let clock = VectorClock::new().tick("ui").tick("human");
    engine.save_project_clock("alpha", &clock).unwrap();
    assert_eq!(engine.project_clock("alpha").unwrap(), clock);

    engine.invalidate_clock_cache();
    assert_eq!(engine.project_clock("alpha").unwrap(), clock);
}

#[test]
fn embedding_cache_lru_eviction_is_bounded() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let entries: Vec<(String, Vec<f32>)> = (0..10)
        .map(|i| (format!("hash{i:02}"), vec![i as f32]))
        .collect();
    engine.cache_put_batch(&entries, "model-a", 4).unwrap();

    let hashes: Vec<String> = (0..10).map(|i| format!("hash{i:02}")).collect();
    let hits = engine.cache_get_batch(&hashes, "model-a").unwrap();
    let live = hits.iter().filter(|h| h.is_some()).count();
    assert_eq!(live, 4);
}

#[test]
fn archive_roundtrip_with_encryption() {
    let dir = tempfile::tempdir().unwrap();
    let source = StorageEngine::open_in_memory().unwrap();
    source
        .insert_chunks(&[chunk("c1", "alpha", "exported content")])
        .unwrap();
    source.insert_vector("c1", "alpha", &[0.6, 0.8]).unwrap();

    let path = dir.path().join("backup.engram");
    let options = ArchiveOptions {
        password: Some("hunter2".into()),
        ..Default::default()
    };
    export_archive(&source, &path, &options).unwrap();

    let target = StorageEngine::open_in_memory().unwrap();
    // Wrong password fails closed.
    assert!(import_archive(&target, &path, Some("wrong")).is_err());

    let stats = import_archive(&target, &path, Some("hunter2")).unwrap();
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.vectors, 1);
    let restored = target.get_chunk("c1").unwrap().unwrap();
    assert_eq!(restored.content, "exported content");
    assert_eq!(target.get_vector("c1").unwrap().unwrap(), vec![0.6, 0.8]);
}

#[test]
fn file_backed_engine_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engram.db");

    {
        let engine = StorageEngine::open_at(&path).unwrap();
        engine
            .insert_chunks(&[chunk("c1", "alpha", "durable")])
            .unwrap();
    }

    let engine = StorageEngine::open_at(&path).unwrap();
    let restored = engine.get_chunk("c1").unwrap().unwrap();
    assert_eq!(restored.content, "durable");
}
