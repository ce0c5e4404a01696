//! Arkalia offline cache gateway entry point.
//!
//! Boots the gateway daemon on stdio transport: install, activate, start the
//! eviction sweep, then serve host events until stdin closes. Logging goes to
//! stderr to keep stdout clean for the JSON-lines protocol.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use arkalia_client::{FetchClient, FetchConfig};
use arkalia_core::{CacheDb, GatewayConfig};

mod events;
mod gateway;
mod offline;
mod strategy;
mod sweep;
#[cfg(test)]
mod testutil;
mod wire;

use events::GatewayEvent;
use gateway::Gateway;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = GatewayConfig::load()?;
    tracing::info!(
        store = %config.cache_name,
        version = %config.version,
        origin = %config.origin,
        "starting offline cache gateway"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        ..Default::default()
    })?);

    let sweep_interval = config.sweep_interval();
    let gateway = Arc::new(Gateway::new(config, db, network));

    gateway.dispatch(GatewayEvent::Install).await?;
    gateway.dispatch(GatewayEvent::Activate).await?;

    let _sweep = sweep::spawn(gateway.clone(), sweep_interval);

    wire::run(gateway).await?;

    Ok(())
}
