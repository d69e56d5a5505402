//! The decay curve family.
//!
//! All curves map a hop distance to a weight in `[0, initial]`. Linear
//! variants hit zero at a closed-form death point; exponential and
//! power-law only approach it, so the engine's `min_weight` floor is what
//! eventually kills those edges.

use serde::{Deserialize, Serialize};

/// One tier of a multi-tier linear curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Weight contributed by this tier at hop 0.
    pub weight: f64,
    /// Hops at full contribution before this tier starts decaying.
    pub hold: f64,
    /// Linear decay rate per hop after the hold.
    pub rate: f64,
}

/// A decay curve: weight as a function of hop distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayCurve {
    /// `w₀ − rate·d`, dead at `w₀/rate`.
    Linear { rate: f64 },
    /// Full weight for `hold` hops, then `w₀ − rate·(d − hold)`.
    DelayedLinear { hold: f64, rate: f64 },
    /// `w₀·e^(−rate·d)`. Asymptotic.
    Exponential { rate: f64 },
    /// `w₀·(1 + k·d)^(−alpha)`. Asymptotic.
    PowerLaw { k: f64, alpha: f64 },
    /// Sum of independently decaying tiers, rescaled so hop 0 equals w₀.
    MultiTier { tiers: Vec<Tier> },
}

impl DecayCurve {
    /// Weight of an edge with the given initial weight after `hops`
    /// hops. Always in `[0, initial]` and non-increasing in `hops`.
    pub fn weight_at(&self, initial: f64, hops: f64) -> f64 {
        let hops = hops.max(0.0);
        let raw = match self {
            DecayCurve::Linear { rate } => initial - rate * hops,
            DecayCurve::DelayedLinear { hold, rate } => {
                if hops <= *hold {
                    initial
                } else {
                    initial - rate * (hops - hold)
                }
            }
            DecayCurve::Exponential { rate } => initial * (-rate * hops).exp(),
            DecayCurve::PowerLaw { k, alpha } => initial * (1.0 + k * hops).powf(-alpha),
            DecayCurve::MultiTier { tiers } => {
                let total: f64 = tiers.iter().map(|t| t.weight).sum();
                if total <= 0.0 {
                    return 0.0;
                }
                let sum: f64 = tiers
                    .iter()
                    .map(|t| {
                        let decayed = if hops <= t.hold {
                            t.weight
                        } else {
                            t.weight - t.rate * (hops - t.hold)
                        };
                        decayed.clamp(0.0, t.weight)
                    })
                    .sum();
                initial * sum / total
            }
        };
        raw.clamp(0.0, initial)
    }

    /// Hop distance at which the curve reaches zero for the given
    /// initial weight. `None` for asymptotic curves.
    pub fn death_point(&self, initial: f64) -> Option<f64> {
        match self {
            DecayCurve::Linear { rate } => Some(initial / rate),
            DecayCurve::DelayedLinear { hold, rate } => Some(hold + initial / rate),
            DecayCurve::Exponential { .. } | DecayCurve::PowerLaw { .. } => None,
            DecayCurve::MultiTier { tiers } => tiers
                .iter()
                .map(|t| t.hold + t.weight / t.rate)
                .fold(None, |acc, d| Some(acc.map_or(d, |a: f64| a.max(d)))),
        }
    }
}
