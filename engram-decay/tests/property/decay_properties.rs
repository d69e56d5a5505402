use chrono::Utc;
use engram_core::clock::VectorClock;
use engram_core::config::DecayConfig;
use engram_core::models::{Direction, Edge, EdgeType};
use engram_decay::{DecayCurve, DecayEngine};
use proptest::prelude::*;

fn make_edge(initial_weight: f64, clock: VectorClock) -> Edge {
    Edge {
        id: uuid::Uuid::new_v4().to_string(),
        source_chunk_id: "s".into(),
        target_chunk_id: "t".into(),
        edge_type: EdgeType::Forward,
        reference_type: None,
        initial_weight,
        created_at: Utc::now(),
        vector_clock: Some(clock),
        link_count: 1,
    }
}

fn clock_at(ticks: u64) -> VectorClock {
    let mut c = VectorClock::new();
    for _ in 0..ticks {
        c = c.tick("ui");
    }
    c
}

fn arb_curve() -> impl Strategy<Value = DecayCurve> {
    prop_oneof![
        (0.01f64..1.0).prop_map(|rate| DecayCurve::Linear { rate }),
        ((0.0f64..10.0), (0.01f64..1.0))
            .prop_map(|(hold, rate)| DecayCurve::DelayedLinear { hold, rate }),
        (0.01f64..2.0).prop_map(|rate| DecayCurve::Exponential { rate }),
        ((0.1f64..5.0), (0.1f64..3.0)).prop_map(|(k, alpha)| DecayCurve::PowerLaw { k, alpha }),
    ]
}

// ── Curve-level properties ───────────────────────────────────────────────

proptest! {
    #[test]
    fn weight_is_non_increasing_in_hops(
        curve in arb_curve(),
        initial in 0.01f64..=1.0,
        hops in proptest::collection::vec(0.0f64..100.0, 2..10),
    ) {
        let mut sorted = hops;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut prev = f64::INFINITY;
        for h in sorted {
            let w = curve.weight_at(initial, h);
            prop_assert!(w <= prev + 1e-12, "increased at {h}: {w} > {prev}");
            prop_assert!((0.0..=initial + 1e-12).contains(&w));
            prev = w;
        }
    }

    #[test]
    fn weight_at_zero_hops_equals_initial(
        curve in arb_curve(),
        initial in 0.01f64..=1.0,
    ) {
        let w = curve.weight_at(initial, 0.0);
        prop_assert!((w - initial).abs() < 1e-12);
    }

    #[test]
    fn weight_is_zero_at_and_beyond_death(
        curve in arb_curve(),
        initial in 0.01f64..=1.0,
        past in 0.0f64..50.0,
    ) {
        if let Some(death) = curve.death_point(initial) {
            // Allow a rounding ulp at the exact death point.
            prop_assert!(curve.weight_at(initial, death) < 1e-9);
            prop_assert!(curve.weight_at(initial, death + past) < 1e-9);
        }
    }
}

// ── Engine-level properties ──────────────────────────────────────────────

proptest! {
    #[test]
    fn effective_weight_is_monotone_in_clock_advance(
        initial in 0.05f64..=1.0,
        ticks in proptest::collection::vec(0u64..30, 2..8),
    ) {
        let engine = DecayEngine::new(DecayConfig::default());
        let edge = make_edge(initial, VectorClock::new());
        let now = Utc::now();

        for direction in [Direction::Backward, Direction::Forward] {
            let mut sorted = ticks.clone();
            sorted.sort_unstable();
            let mut prev = f64::INFINITY;
            for &t in &sorted {
                let w = engine.effective_weight(&edge, direction, &clock_at(t), now);
                prop_assert!(w <= prev + 1e-12);
                prev = w;
            }
        }
    }

    #[test]
    fn boost_never_resurrects_dead_edges(link_count in 2u32..10_000) {
        let engine = DecayEngine::new(DecayConfig::default());
        let mut edge = make_edge(1.0, VectorClock::new());
        edge.link_count = link_count;
        // 10 hops kills a backward edge regardless of link count.
        let w = engine.boosted_weight(&edge, Direction::Backward, &clock_at(10), Utc::now());
        prop_assert_eq!(w, 0.0);
    }

    #[test]
    fn boost_is_monotone_in_link_count(count in 1u32..1000) {
        let base = engram_decay::engine::apply_link_boost(0.5, count);
        let more = engram_decay::engine::apply_link_boost(0.5, count + 1);
        prop_assert!(more >= base);
    }
}
