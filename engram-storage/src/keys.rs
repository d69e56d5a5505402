//! Encryption key handling.
//!
//! The key arrives from the host's secret store, lives only inside a
//! zeroing buffer, and is applied to connections via `PRAGMA key` when
//! the crate is built against SQLCipher. Key bytes never appear in
//! errors or logs.

use rusqlite::Connection;
use zeroize::Zeroizing;

use engram_core::errors::EngramResult;

/// A database key held in memory that is scrubbed on drop.
pub struct KeyMaterial {
    key: Zeroizing<String>,
}

impl KeyMaterial {
    pub fn new(key: String) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Apply the key to a freshly opened connection, before any other
    /// statement touches the file.
    #[cfg(feature = "sqlcipher")]
    pub fn apply(&self, conn: &Connection) -> EngramResult<()> {
        conn.pragma_update(None, "key", self.key.as_str())
            .map_err(|e| crate::to_storage_err(e.to_string()))
    }

    /// Without a SQLCipher build the key cannot be applied; opening an
    /// encrypted file will fail at the first query instead.
    #[cfg(not(feature = "sqlcipher"))]
    pub fn apply(&self, _conn: &Connection) -> EngramResult<()> {
        tracing::warn!("encryption key supplied but this build has no cipher support");
        Ok(())
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(…)")
    }
}
