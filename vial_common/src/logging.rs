//! Tracing subscriber setup.

use crate::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` directives are honoured; `level` is added as the default
/// directive. Calling this twice is harmless, the second call is ignored.
pub fn init_tracing(level: LogLevel, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(
        level
            .as_directive()
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );

    let result = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
