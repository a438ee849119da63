use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{CoreError, Result};

/// Install a `fmt` subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|err| CoreError::Tracing(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error() {
        let _ = init_tracing("debug");
        assert!(matches!(init_tracing("debug"), Err(CoreError::Tracing(_))));
    }
}
