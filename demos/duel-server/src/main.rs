//! Standalone duelroom server.
//!
//! Settings come from the environment:
//!
//! - `DUELROOM_BIND`: listen address (default `127.0.0.1:3001`)
//! - `DUELROOM_IDLE_TIMEOUT_SECS`: idle connection timeout (default 300)
//! - `RUST_LOG`: log filter (default `info`)

use duelroom::prelude::*;
use tracing_subscriber::EnvFilter;

/// Builds the server config from an environment lookup, keeping the
/// default for anything unset or unparsable.
fn config_from(lookup: impl Fn(&str) -> Option<String>) -> ServerConfig {
    let mut config = ServerConfig::default();
    if let Some(addr) = lookup("DUELROOM_BIND") {
        config.bind_addr = addr;
    }
    if let Some(raw) = lookup("DUELROOM_IDLE_TIMEOUT_SECS") {
        match raw.parse() {
            Ok(secs) => config.idle_timeout_secs = secs,
            Err(_) => tracing::warn!(value = %raw, "ignoring bad DUELROOM_IDLE_TIMEOUT_SECS"),
        }
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from(|key| std::env::var(key).ok());
    tracing::info!(
        addr = %config.bind_addr,
        idle_timeout_secs = config.idle_timeout_secs,
        "starting duel server"
    );

    let server = DuelServerBuilder::new().config(config).build().await?;
    server.run().await?;
    Ok(())
}
