//! Blob and hash codecs shared across the workspace.
//!
//! Embeddings and centroids travel as packed little-endian IEEE-754 f32
//! blobs. Chunk content hashes are SHA-256 hex (the embedding cache key);
//! cluster membership hashes are blake3 over the sorted member id list.

use sha2::{Digest, Sha256};

/// Pack a vector into a little-endian f32 blob.
pub fn pack_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Unpack a little-endian f32 blob. Trailing bytes that do not form a
/// whole f32 are ignored.
pub fn unpack_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// SHA-256 hex digest of chunk text. Keys the embedding cache together
/// with the model id.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Membership hash of a cluster: blake3 over the lexicographically sorted
/// member ids. Equal member sets hash equal regardless of input order.
pub fn membership_hash(member_ids: &[String]) -> String {
    let mut sorted: Vec<&str> = member_ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = blake3::Hasher::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Approximate token count from character length.
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(crate::constants::CHARS_PER_TOKEN)
}

/// Angular distance between unit vectors: `1 − u·v`. Zero for identical
/// directions, 2 for opposite.
pub fn angular_distance(u: &[f32], v: &[f32]) -> f64 {
    1.0 - dot(u, v)
}

/// Cosine similarity, assuming unit-norm inputs.
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> f64 {
    dot(u, v)
}

fn dot(u: &[f32], v: &[f32]) -> f64 {
    u.iter()
        .zip(v.iter())
        .map(|(a, b)| *a as f64 * *b as f64)
        .sum()
}

/// L2-normalize in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm: f64 = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_blob_roundtrip() {
        let values = vec![1.0f32, -2.5, 0.0, 3.25e-7];
        assert_eq!(unpack_f32(&pack_f32(&values)), values);
    }

    #[test]
    fn unpack_ignores_trailing_bytes() {
        let mut bytes = pack_f32(&[1.0, 2.0]);
        bytes.push(0xFF);
        assert_eq!(unpack_f32(&bytes), vec![1.0, 2.0]);
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn membership_hash_is_order_independent() {
        let a = membership_hash(&["b".into(), "a".into(), "c".into()]);
        let b = membership_hash(&["c".into(), "b".into(), "a".into()]);
        assert_eq!(a, b);
        let c = membership_hash(&["a".into(), "b".into()]);
        assert_ne!(a, c);
    }

    #[test]
    fn angular_distance_on_unit_vectors() {
        let u = [1.0f32, 0.0];
        let v = [0.0f32, 1.0];
        assert!((angular_distance(&u, &u)).abs() < 1e-9);
        assert!((angular_distance(&u, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_produces_unit_norm() {
        let mut v = [3.0f32, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
