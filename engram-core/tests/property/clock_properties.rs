use engram_core::clock::{ClockOrdering, VectorClock};
use proptest::prelude::*;

/// Arbitrary clock over a small closed agent universe.
fn arb_clock() -> impl Strategy<Value = VectorClock> {
    proptest::collection::vec(0u64..20, 4).prop_map(|ticks| {
        let agents = ["ui", "human", "a1", "a2"];
        let mut clock = VectorClock::new();
        for (agent, &n) in agents.iter().zip(ticks.iter()) {
            for _ in 0..n {
                clock = clock.tick(agent);
            }
        }
        clock
    })
}

// ── Partial order ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn happened_before_implies_one_way_hops(a in arb_clock(), b in arb_clock()) {
        if a.happened_before(&b) {
            prop_assert!(a.hop_count(&b) > 0);
            prop_assert_eq!(b.hop_count(&a), 0);
        }
    }

    #[test]
    fn concurrent_clocks_hop_both_ways(a in arb_clock(), b in arb_clock()) {
        if a.compare(&b) == ClockOrdering::Concurrent {
            prop_assert!(a.hop_count(&b) > 0);
            prop_assert!(b.hop_count(&a) > 0);
        }
    }

    #[test]
    fn comparison_is_antisymmetric(a in arb_clock(), b in arb_clock()) {
        let forward = a.compare(&b);
        let backward = b.compare(&a);
        let expected = match forward {
            ClockOrdering::Equal => ClockOrdering::Equal,
            ClockOrdering::Before => ClockOrdering::After,
            ClockOrdering::After => ClockOrdering::Before,
            ClockOrdering::Concurrent => ClockOrdering::Concurrent,
        };
        prop_assert_eq!(backward, expected);
    }
}

// ── Merge algebra ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_is_commutative_and_dominating(a in arb_clock(), b in arb_clock()) {
        let ab = a.merge(&b);
        let ba = b.merge(&a);
        prop_assert_eq!(&ab, &ba);
        // The merge dominates both inputs element-wise.
        prop_assert_eq!(ab.hop_count(&a), 0);
        prop_assert_eq!(ab.hop_count(&b), 0);
    }

    #[test]
    fn merge_is_idempotent(a in arb_clock()) {
        prop_assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn ticks_on_distinct_agents_commute(c in arb_clock()) {
        prop_assert_eq!(c.tick("ui").tick("a1"), c.tick("a1").tick("ui"));
    }

    #[test]
    fn tick_advances_exactly_one_hop(c in arb_clock()) {
        let next = c.tick("ui");
        prop_assert_eq!(c.hop_count(&next), 1);
        prop_assert_eq!(next.hop_count(&c), 0);
    }
}

// ── Codec leniency ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn json_roundtrip_is_identity(a in arb_clock()) {
        prop_assert_eq!(VectorClock::from_json(&a.to_json()), a);
    }

    #[test]
    fn arbitrary_bytes_never_panic(junk in "\\PC*") {
        let _ = VectorClock::from_json(&junk);
    }
}
