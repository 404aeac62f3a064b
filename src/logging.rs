//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout stays reserved for the conversation. The filter
//! comes from `STREAM_CHAT_LOG`, then `RUST_LOG`, then the given default level.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "STREAM_CHAT_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::new(format!("stream_chat={default_level},chat_api={default_level}"))
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install tracing subscriber: {error}"))
}
