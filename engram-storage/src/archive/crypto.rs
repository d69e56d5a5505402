//! Password-based authenticated encryption for archives.
//!
//! Layout of an encrypted archive: magic, cipher tag byte, 16-byte
//! scrypt salt, 12-byte nonce, AEAD ciphertext. The key is derived with
//! scrypt at the default cost parameters and scrubbed after use.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaNonce};
use rand::RngCore;
use zeroize::Zeroizing;

use engram_core::config::CipherKind;
use engram_core::errors::{EngramResult, StorageError};

/// Magic prefix of encrypted archives.
pub const MAGIC: &[u8; 6] = b"ENGRM\x01";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn archive_err(reason: impl Into<String>) -> engram_core::errors::EngramError {
    StorageError::ArchiveFailed {
        reason: reason.into(),
    }
    .into()
}

fn derive_key(password: &str, salt: &[u8]) -> EngramResult<Zeroizing<[u8; KEY_LEN]>> {
    let params = scrypt::Params::new(15, 8, 1, KEY_LEN)
        .map_err(|e| archive_err(format!("scrypt params: {e}")))?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key[..])
        .map_err(|e| archive_err(format!("key derivation: {e}")))?;
    Ok(key)
}

fn cipher_tag(cipher: CipherKind) -> u8 {
    match cipher {
        CipherKind::Chacha20 => 0x01,
        CipherKind::Aes256Gcm => 0x02,
    }
}

fn cipher_from_tag(tag: u8) -> Option<CipherKind> {
    match tag {
        0x01 => Some(CipherKind::Chacha20),
        0x02 => Some(CipherKind::Aes256Gcm),
        _ => None,
    }
}

/// Seal plaintext under a password-derived key.
pub fn seal(plaintext: &[u8], password: &str, cipher: CipherKind) -> EngramResult<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let key = derive_key(password, &salt)?;
    let ciphertext = match cipher {
        CipherKind::Chacha20 => ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| archive_err("bad key length"))?
            .encrypt(ChaNonce::from_slice(&nonce), plaintext)
            .map_err(|_| archive_err("encryption failed"))?,
        CipherKind::Aes256Gcm => Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|_| archive_err("bad key length"))?
            .encrypt(AesNonce::from_slice(&nonce), plaintext)
            .map_err(|_| archive_err("encryption failed"))?,
    };

    let mut out = Vec::with_capacity(MAGIC.len() + 1 + SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.push(cipher_tag(cipher));
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Whether the bytes carry the encrypted-archive magic.
pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.len() > MAGIC.len() && bytes.starts_with(MAGIC)
}

/// Open a sealed archive. Fails on a wrong password or tampering (AEAD
/// authentication).
pub fn open(bytes: &[u8], password: &str) -> EngramResult<Vec<u8>> {
    let header = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;
    if !is_sealed(bytes) || bytes.len() <= header {
        return Err(archive_err("not an encrypted archive"));
    }
    let cipher = cipher_from_tag(bytes[MAGIC.len()])
        .ok_or_else(|| archive_err("unknown cipher tag"))?;
    let salt = &bytes[MAGIC.len() + 1..MAGIC.len() + 1 + SALT_LEN];
    let nonce: [u8; NONCE_LEN] = bytes[MAGIC.len() + 1 + SALT_LEN..header]
        .try_into()
        .map_err(|_| archive_err("truncated nonce"))?;
    let ciphertext = &bytes[header..];

    let key = derive_key(password, salt)?;
    let plaintext = match cipher {
        CipherKind::Chacha20 => ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| archive_err("bad key length"))?
            .decrypt(ChaNonce::from_slice(&nonce), ciphertext)
            .map_err(|_| archive_err("decryption failed: wrong password or corrupt archive"))?,
        CipherKind::Aes256Gcm => Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|_| archive_err("bad key length"))?
            .decrypt(AesNonce::from_slice(&nonce), ciphertext)
            .map_err(|_| archive_err("decryption failed: wrong password or corrupt archive"))?,
    };
    Ok(plaintext)
}
