//! Effective-weight computation for stored edges.

use chrono::{DateTime, Utc};

use engram_core::clock::VectorClock;
use engram_core::config::DecayConfig;
use engram_core::constants::LINK_COUNT_BOOST_FACTOR;
use engram_core::models::{Direction, Edge};

use crate::curves::DecayCurve;

/// Computes decayed edge weights against a reference clock.
///
/// Weights at or below the configured floor collapse to exactly 0.0, so
/// callers can treat `effective_weight <= 0` as "dead" without knowing
/// the floor.
#[derive(Debug, Clone)]
pub struct DecayEngine {
    config: DecayConfig,
    backward: DecayCurve,
    forward: DecayCurve,
}

impl DecayEngine {
    pub fn new(config: DecayConfig) -> Self {
        let backward = DecayCurve::Linear {
            rate: config.backward_rate,
        };
        let forward = DecayCurve::DelayedLinear {
            hold: config.forward_hold_hops,
            rate: config.forward_rate,
        };
        Self {
            config,
            backward,
            forward,
        }
    }

    /// The curve applied when traversing in `direction`.
    pub fn curve_for(&self, direction: Direction) -> &DecayCurve {
        match direction {
            Direction::Backward => &self.backward,
            Direction::Forward => &self.forward,
        }
    }

    /// Hop distance of an edge from the reference clock. Clockless edges
    /// fall back to wall-clock age scaled by `hours_per_hop`.
    pub fn hops(&self, edge: &Edge, ref_clock: &VectorClock, now: DateTime<Utc>) -> f64 {
        match &edge.vector_clock {
            Some(clock) => clock.hop_count(ref_clock) as f64,
            None => {
                let age_hours = (now - edge.created_at).num_seconds().max(0) as f64 / 3600.0;
                age_hours / self.config.hours_per_hop
            }
        }
    }

    /// Decayed weight of an edge in the given direction, without the
    /// link-count boost. Non-increasing in hop distance; snaps to 0.0
    /// at or below the floor.
    pub fn effective_weight(
        &self,
        edge: &Edge,
        direction: Direction,
        ref_clock: &VectorClock,
        now: DateTime<Utc>,
    ) -> f64 {
        let hops = self.hops(edge, ref_clock, now);
        let weight = self
            .curve_for(direction)
            .weight_at(edge.initial_weight, hops);
        if weight <= self.config.min_weight {
            0.0
        } else {
            weight
        }
    }

    /// Read-time weight including the logarithmic link-count boost.
    /// Dead edges stay dead: the boost never resurrects a zero.
    pub fn boosted_weight(
        &self,
        edge: &Edge,
        direction: Direction,
        ref_clock: &VectorClock,
        now: DateTime<Utc>,
    ) -> f64 {
        let weight = self.effective_weight(edge, direction, ref_clock, now);
        apply_link_boost(weight, edge.link_count)
    }

    pub fn min_weight(&self) -> f64 {
        self.config.min_weight
    }
}

impl Default for DecayEngine {
    fn default() -> Self {
        Self::new(DecayConfig::default())
    }
}

/// `w × (1 + ln(link_count) × 0.1)` for `link_count > 1`.
pub fn apply_link_boost(weight: f64, link_count: u32) -> f64 {
    if link_count > 1 && weight > 0.0 {
        weight * (1.0 + (link_count as f64).ln() * LINK_COUNT_BOOST_FACTOR)
    } else {
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{EdgeType, ReferenceType};

    fn edge_with_clock(clock: VectorClock) -> Edge {
        Edge {
            id: "e1".into(),
            source_chunk_id: "a".into(),
            target_chunk_id: "b".into(),
            edge_type: EdgeType::Forward,
            reference_type: Some(ReferenceType::Adjacent),
            initial_weight: 1.0,
            created_at: Utc::now(),
            vector_clock: Some(clock),
            link_count: 1,
        }
    }

    fn advance(clock: &VectorClock, agent: &str, ticks: u64) -> VectorClock {
        let mut c = clock.clone();
        for _ in 0..ticks {
            c = c.tick(agent);
        }
        c
    }

    #[test]
    fn backward_edge_dies_at_ten_hops() {
        let engine = DecayEngine::default();
        let birth = VectorClock::new();
        let edge = edge_with_clock(birth.clone());
        let now = Utc::now();

        let at_zero = engine.effective_weight(&edge, Direction::Backward, &birth, now);
        assert!((at_zero - 1.0).abs() < 1e-12);

        let at_five = advance(&birth, "ui", 5);
        let w = engine.effective_weight(&edge, Direction::Backward, &at_five, now);
        assert!((w - 0.5).abs() < 1e-12);

        let at_ten = advance(&birth, "ui", 10);
        assert_eq!(
            engine.effective_weight(&edge, Direction::Backward, &at_ten, now),
            0.0
        );
    }

    #[test]
    fn forward_edge_holds_five_hops() {
        let engine = DecayEngine::default();
        let birth = VectorClock::new();
        let edge = edge_with_clock(birth.clone());
        let now = Utc::now();

        let at_five = advance(&birth, "ui", 5);
        let w = engine.effective_weight(&edge, Direction::Forward, &at_five, now);
        assert!((w - 1.0).abs() < 1e-12);

        let at_twenty = advance(&birth, "ui", 21);
        assert_eq!(
            engine.effective_weight(&edge, Direction::Forward, &at_twenty, now),
            0.0
        );
    }

    #[test]
    fn clockless_edge_decays_on_wall_clock_age() {
        let engine = DecayEngine::default();
        let mut edge = edge_with_clock(VectorClock::new());
        edge.vector_clock = None;
        edge.created_at = Utc::now() - chrono::Duration::hours(48);

        // 48h at 24h/hop = 2 hops; backward linear → 0.8.
        let w = engine.effective_weight(&edge, Direction::Backward, &VectorClock::new(), Utc::now());
        assert!((w - 0.8).abs() < 1e-6);
    }

    #[test]
    fn link_boost_is_logarithmic_and_skips_dead_edges() {
        assert_eq!(apply_link_boost(1.0, 1), 1.0);
        let boosted = apply_link_boost(1.0, 3);
        assert!((boosted - (1.0 + 3.0f64.ln() * 0.1)).abs() < 1e-12);
        assert_eq!(apply_link_boost(0.0, 100), 0.0);
    }

    #[test]
    fn weights_at_or_below_the_floor_snap_to_zero() {
        let config = engram_core::config::DecayConfig {
            min_weight: 0.15,
            ..Default::default()
        };
        let engine = DecayEngine::new(config);
        let birth = VectorClock::new();
        let edge = edge_with_clock(birth.clone());
        let now = Utc::now();

        // Raw weight at 9 hops is 0.1, below the 0.15 floor.
        let at_nine = advance(&birth, "ui", 9);
        assert_eq!(
            engine.effective_weight(&edge, Direction::Backward, &at_nine, now),
            0.0
        );

        // At 8 hops the raw weight 0.2 clears the floor and survives.
        let at_eight = advance(&birth, "ui", 8);
        let w = engine.effective_weight(&edge, Direction::Backward, &at_eight, now);
        assert!((w - 0.2).abs() < 1e-12);
    }
}
