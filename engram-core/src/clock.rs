//! Vector clocks over agent identities.
//!
//! Each agent that produces turns (the main UI, the human, any spawned
//! sub-agent) owns one tick counter. The empty clock is "before all
//! events". Merge takes the per-agent maximum; tick advances one agent by
//! one. The hop count between two clocks is the causal distance used by
//! edge decay.
//!
//! # Examples
//!
//! ```
//! use engram_core::clock::VectorClock;
//!
//! let parent = VectorClock::new().tick("ui").tick("human");
//! let child = parent.spawn("a1");
//! let child = child.tick("a1").tick("a1");
//!
//! let debriefed = parent.tick("ui").merge(&child);
//! assert_eq!(debriefed.get("a1"), 2);
//! assert_eq!(debriefed.get("ui"), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result of comparing two clocks under the induced partial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOrdering {
    Equal,
    /// `self` happened strictly before `other`.
    Before,
    /// `self` happened strictly after `other`.
    After,
    /// Neither dominates the other.
    Concurrent,
}

/// A mapping from agent id to a non-negative tick count.
///
/// All operations are pure: they return new clocks and never mutate the
/// receiver. BTreeMap keeps agent iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock(BTreeMap<String, u64>);

impl VectorClock {
    /// The empty clock: before all events.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Tick count for an agent; absent agents read as 0.
    pub fn get(&self, agent_id: &str) -> u64 {
        self.0.get(agent_id).copied().unwrap_or(0)
    }

    /// Whether no agent has ticked yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Agents known to this clock.
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Return a new clock with the named agent advanced by one.
    pub fn tick(&self, agent_id: &str) -> Self {
        let mut next = self.0.clone();
        *next.entry(agent_id.to_string()).or_insert(0) += 1;
        Self(next)
    }

    /// Element-wise maximum of both clocks.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        for (agent, &ticks) in &other.0 {
            let entry = merged.entry(agent.clone()).or_insert(0);
            *entry = (*entry).max(ticks);
        }
        Self(merged)
    }

    /// Clock for a freshly spawned sub-agent: the parent's clock plus a
    /// zero entry for the new agent.
    pub fn spawn(&self, agent_id: &str) -> Self {
        let mut next = self.0.clone();
        next.entry(agent_id.to_string()).or_insert(0);
        Self(next)
    }

    /// Causal distance from `self` to `reference`: the sum of per-agent
    /// advances of `reference` over `self`, over all agents known to
    /// either clock. Agents absent from `self` count from zero, so a
    /// reference clock that only added a new agent still registers hops.
    pub fn hop_count(&self, reference: &Self) -> u64 {
        let mut hops = 0;
        for (agent, &ref_ticks) in &reference.0 {
            hops += ref_ticks.saturating_sub(self.get(agent));
        }
        hops
    }

    /// Partial-order comparison induced by element-wise ≤.
    pub fn compare(&self, other: &Self) -> ClockOrdering {
        let ahead = other.hop_count(self) > 0;
        let behind = self.hop_count(other) > 0;
        match (ahead, behind) {
            (false, false) => ClockOrdering::Equal,
            (false, true) => ClockOrdering::Before,
            (true, false) => ClockOrdering::After,
            (true, true) => ClockOrdering::Concurrent,
        }
    }

    /// Whether `self` happened strictly before `other`.
    pub fn happened_before(&self, other: &Self) -> bool {
        self.compare(other) == ClockOrdering::Before
    }

    /// Serialize to the canonical JSON object form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Deserialize from JSON. Lenient by contract: malformed input yields
    /// the empty clock, and unknown or non-numeric or negative entries are
    /// discarded rather than rejected.
    pub fn from_json(json: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(json) else {
            return Self::new();
        };
        let Some(map) = value.as_object() else {
            return Self::new();
        };
        let mut clock = BTreeMap::new();
        for (agent, ticks) in map {
            if let Some(n) = ticks.as_u64() {
                clock.insert(agent.clone(), n);
            }
        }
        Self(clock)
    }
}

impl std::fmt::Display for VectorClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
