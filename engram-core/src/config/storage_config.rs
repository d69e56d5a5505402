use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{ConfigError, EngramResult};

/// Symmetric cipher for the database file and export archives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherKind {
    #[default]
    Chacha20,
    Aes256Gcm,
}

/// Storage subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. None opens an in-memory database (tests).
    pub db_path: Option<PathBuf>,
    /// Name under which the secret store holds the encryption key.
    /// None disables at-rest encryption.
    pub encryption_key_name: Option<String>,
    pub cipher: CipherKind,
    /// Record open/close/query/key events in the audit log.
    pub audit_enabled: bool,
    /// Hours an orphaned chunk survives before cleanup.
    pub orphan_ttl_hours: u64,
    /// Read pool size for file-backed databases.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            encryption_key_name: None,
            cipher: CipherKind::default(),
            audit_enabled: false,
            orphan_ttl_hours: constants::DEFAULT_ORPHAN_TTL_HOURS,
            read_pool_size: 4,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> EngramResult<()> {
        if self.read_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.read_pool_size".into(),
                reason: "must be at least 1".into(),
            }
            .into());
        }
        Ok(())
    }
}
