use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for an [`ActionLifecycle`](crate::ActionLifecycle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Give up waiting for settlement after this long. `None` waits forever.
    pub settlement_timeout: Option<Duration>,

    /// Capacity of the transition broadcast channels.
    pub transition_buffer: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            settlement_timeout: None,
            transition_buffer: 16,
        }
    }
}

impl LifecycleConfig {
    pub fn with_settlement_timeout(timeout: Duration) -> Self {
        Self {
            settlement_timeout: Some(timeout),
            ..Self::default()
        }
    }
}
