use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{ConfigError, EngramResult};

/// Decay subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Linear rate per hop for backward (recall) edges.
    pub backward_rate: f64,
    /// Hops at full weight before forward (predict) decay starts.
    pub forward_hold_hops: f64,
    /// Linear rate per hop for forward edges after the hold.
    pub forward_rate: f64,
    /// Effective weight floor; below it an edge is dead.
    pub min_weight: f64,
    /// Wall-clock hours treated as one hop for clockless edges.
    pub hours_per_hop: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            backward_rate: constants::BACKWARD_DECAY_RATE,
            forward_hold_hops: constants::FORWARD_DECAY_HOLD_HOPS,
            forward_rate: constants::FORWARD_DECAY_RATE,
            min_weight: constants::DEFAULT_MIN_EDGE_WEIGHT,
            hours_per_hop: constants::DEFAULT_HOURS_PER_HOP,
        }
    }
}

impl DecayConfig {
    pub fn validate(&self) -> EngramResult<()> {
        for (field, value) in [
            ("decay.backward_rate", self.backward_rate),
            ("decay.forward_rate", self.forward_rate),
            ("decay.hours_per_hop", self.hours_per_hop),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: "must be positive".into(),
                }
                .into());
            }
        }
        if !(0.0..1.0).contains(&self.min_weight) {
            return Err(ConfigError::InvalidValue {
                field: "decay.min_weight".into(),
                reason: "must be in [0, 1)".into(),
            }
            .into());
        }
        Ok(())
    }
}
