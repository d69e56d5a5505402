/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error("missing required field: {field}")]
    MissingRequired { field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::ConfigInvalid { .. } => "CONFIG_INVALID",
            ConfigError::MissingRequired { .. } => "MISSING_REQUIRED",
            ConfigError::InvalidValue { .. } => "INVALID_VALUE",
        }
    }
}
