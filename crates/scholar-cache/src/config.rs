use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`ResultCache`](crate::ResultCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age of an entry. Shared by every entry of one cache.
    pub ttl: Duration,

    /// Sweep expired entries on every insert.
    pub sweep_on_insert: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            sweep_on_insert: true,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }
}
