//! Engine configuration.
//!
//! Every option object from the host is parsed once into these structs,
//! validated at construction, and passed by reference afterwards. Absent
//! fields fill from the documented defaults in [`crate::constants`].

mod cluster_config;
mod decay_config;
mod ingest_config;
mod retrieval_config;
mod storage_config;

pub use cluster_config::{ClusterConfig, DistanceMetric};
pub use decay_config::DecayConfig;
pub use ingest_config::IngestConfig;
pub use retrieval_config::RetrievalConfig;
pub use storage_config::{CipherKind, StorageConfig};

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, EngramResult};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    pub storage: StorageConfig,
    pub decay: DecayConfig,
    pub cluster: ClusterConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
}

impl EngramConfig {
    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> EngramResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::ConfigInvalid {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section. Called once at engine construction.
    pub fn validate(&self) -> EngramResult<()> {
        self.storage.validate()?;
        self.decay.validate()?;
        self.cluster.validate()?;
        self.retrieval.validate()?;
        self.ingest.validate()?;
        Ok(())
    }
}
