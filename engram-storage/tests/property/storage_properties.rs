use chrono::Utc;
use engram_core::clock::VectorClock;
use engram_core::codec::membership_hash;
use engram_core::models::{Chunk, Cluster, ClusterAssignment, Edge, EdgeType, ReferenceType};
use engram_core::traits::{IClusterStore, IMemoryStore};
use engram_storage::StorageEngine;
use proptest::prelude::*;

fn make_chunk(id: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        session_id: "s1".into(),
        project_slug: "proj".into(),
        turn_indices: vec![0],
        start_time: Utc::now(),
        end_time: Utc::now(),
        content: format!("chunk {id}"),
        code_block_count: 0,
        tool_use_count: 0,
        approx_tokens: 2,
        created_at: Utc::now(),
        agent_id: None,
        vector_clock: Some(VectorClock::new()),
        spawn_depth: 0,
    }
}

fn make_edge(id: &str, source: &str, target: &str) -> Edge {
    Edge {
        id: id.to_string(),
        source_chunk_id: source.to_string(),
        target_chunk_id: target.to_string(),
        edge_type: EdgeType::Forward,
        reference_type: Some(ReferenceType::Adjacent),
        initial_weight: 1.0,
        created_at: Utc::now(),
        vector_clock: Some(VectorClock::new()),
        link_count: 1,
    }
}

// ── Edge uniqueness ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn link_count_equals_assertion_count(asserts in 1usize..8) {
        let engine = StorageEngine::open_in_memory().unwrap();
        engine.insert_chunks(&[make_chunk("a"), make_chunk("b")]).unwrap();

        let mut inserted_total = 0;
        let mut boosted_total = 0;
        for i in 0..asserts {
            let stats = engine
                .create_or_boost_edges(&[make_edge(&format!("e{i}"), "a", "b")])
                .unwrap();
            inserted_total += stats.inserted;
            boosted_total += stats.boosted;
        }

        prop_assert_eq!(inserted_total, 1);
        prop_assert_eq!(boosted_total, asserts - 1);

        let set = engine
            .weighted_edges("a", engram_core::models::Direction::Forward, &VectorClock::new())
            .unwrap();
        prop_assert_eq!(set.live.len(), 1);
        prop_assert_eq!(set.live[0].edge.link_count as usize, asserts);
    }
}

// ── First-write-wins on conflict attributes ──────────────────────────────

#[test]
fn conflicting_edge_keeps_first_attributes() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine
        .insert_chunks(&[make_chunk("a"), make_chunk("b")])
        .unwrap();

    let first = make_edge("e1", "a", "b");
    engine.create_or_boost_edges(&[first]).unwrap();

    let mut second = make_edge("e2", "a", "b");
    second.initial_weight = 0.25;
    second.reference_type = Some(ReferenceType::CrossSession);
    engine.create_or_boost_edges(&[second]).unwrap();

    let set = engine
        .weighted_edges(
            "a",
            engram_core::models::Direction::Forward,
            &VectorClock::new(),
        )
        .unwrap();
    assert_eq!(set.live.len(), 1);
    let edge = &set.live[0].edge;
    assert_eq!(edge.id, "e1");
    assert_eq!(edge.initial_weight, 1.0);
    assert_eq!(edge.reference_type, Some(ReferenceType::Adjacent));
    assert_eq!(edge.link_count, 2);
}

// ── Membership hash round-trip ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn stored_membership_hash_matches_members(n in 1usize..6) {
        let engine = StorageEngine::open_in_memory().unwrap();
        let chunks: Vec<Chunk> = (0..n).map(|i| make_chunk(&format!("c{i}"))).collect();
        engine.insert_chunks(&chunks).unwrap();

        let member_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let cluster = Cluster {
            id: "cl1".into(),
            name: None,
            description: None,
            centroid: Some(vec![1.0, 0.0]),
            exemplar_ids: member_ids.iter().take(3).cloned().collect(),
            membership_hash: Some(membership_hash(&member_ids)),
            created_at: Utc::now(),
            refreshed_at: None,
        };
        let assignments: Vec<ClusterAssignment> = member_ids
            .iter()
            .map(|id| ClusterAssignment {
                chunk_id: id.clone(),
                cluster_id: "cl1".into(),
                distance: 0.1,
            })
            .collect();
        engine.replace_cluster(&cluster, &assignments).unwrap();

        // Recompute from what the store reports.
        let members: Vec<String> = engine
            .cluster_members("cl1")
            .unwrap()
            .into_iter()
            .map(|a| a.chunk_id)
            .collect();
        let stored = engine.get_cluster("cl1").unwrap().unwrap();
        prop_assert_eq!(stored.membership_hash, Some(membership_hash(&members)));
    }
}

// ── Duplicate chunk ids fail the whole batch ─────────────────────────────

#[test]
fn duplicate_chunk_ids_are_rejected_atomically() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine.insert_chunks(&[make_chunk("dup")]).unwrap();

    let result = engine.insert_chunks(&[make_chunk("fresh"), make_chunk("dup")]);
    assert!(result.is_err());
    // The batch rolled back: "fresh" must not exist.
    assert!(engine.get_chunk("fresh").unwrap().is_none());
}
