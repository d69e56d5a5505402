//! Synthetic point clouds for clustering tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Gaussian blobs around the given centers, `n_per_blob` points each.
/// Deterministic for a fixed seed.
pub fn gaussian_blobs(
    centers: &[Vec<f32>],
    n_per_blob: usize,
    sigma: f32,
    seed: u64,
) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(centers.len() * n_per_blob);
    for center in centers {
        for _ in 0..n_per_blob {
            let point = center
                .iter()
                .map(|&c| c + gauss(&mut rng) * sigma)
                .collect();
            points.push(point);
        }
    }
    points
}

/// Uniform noise points in `[lo, hi]^dim`.
pub fn uniform_noise(n: usize, dim: usize, lo: f32, hi: f32, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(lo..hi)).collect())
        .collect()
}

/// Box–Muller standard normal sample.
fn gauss(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
