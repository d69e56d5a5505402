//! Distance metrics.
//!
//! Angular distance on unit vectors is a monotone function of squared
//! Euclidean distance (`d_e² = 2·d_a`), so the spatial index always
//! works in Euclidean space and converts afterwards.

use engram_core::config::DistanceMetric;

pub fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

pub fn angular(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum();
    1.0 - dot
}

pub fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f64 {
    match metric {
        DistanceMetric::Euclidean => euclidean(a, b),
        DistanceMetric::Angular => angular(a, b),
    }
}

/// Convert a Euclidean distance between unit vectors to angular.
pub fn euclidean_to_angular(d: f64) -> f64 {
    d * d / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_basics() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn angular_matches_converted_euclidean_on_unit_vectors() {
        let a = [0.6f32, 0.8];
        let b = [1.0f32, 0.0];
        let direct = angular(&a, &b);
        let converted = euclidean_to_angular(euclidean(&a, &b));
        assert!((direct - converted).abs() < 1e-6);
    }
}
