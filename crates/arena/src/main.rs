//! The `arena` server binary.
//!
//! Configuration comes from the environment (see [`ServerConfig`]);
//! logging is controlled by `ARENA_LOG`, falling back to `RUST_LOG`.

use arena::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ArenaError> {
    let filter = EnvFilter::try_from_env("ARENA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    let server = ArenaServer::builder()
        .from_config(&config)
        .build(
            MemoryLedger::new(config.items.clone()),
            ConfiguredOracle::from_config(&config),
            config.resolver_config(),
        )
        .await?;

    tracing::info!(
        http = %server.http_addr()?,
        ws = %server.ws_addr()?,
        gating_contract = %config.gating_contract,
        "starting"
    );
    server.run().await
}
