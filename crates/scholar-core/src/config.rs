use std::path::Path;

use scholar_cache::CacheConfig;
use scholar_gate::GateConfig;
use scholar_lifecycle::LifecycleConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Top-level configuration. Omitted sections and fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cache: CacheConfig,
    pub gate: GateConfig,
    pub lifecycle: LifecycleConfig,
}

impl CoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading config");
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl.is_zero() {
            return Err(ConfigError::Invalid("cache.ttl must be greater than zero".into()));
        }
        if self.lifecycle.transition_buffer == 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.transition_buffer must be greater than zero".into(),
            ));
        }
        if self.lifecycle.settlement_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Invalid(
                "lifecycle.settlement_timeout must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}
