//! Periodic eviction sweep.
//!
//! Runs on a fixed interval independent of request traffic. This is the only
//! mechanism that bounds growth from the cache-first and
//! stale-while-revalidate write paths.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::events::GatewayEvent;
use crate::gateway::Gateway;

/// Spawn the sweep task. The first sweep fires one full interval after
/// startup, matching a plain recurring timer.
pub fn spawn(gateway: Arc<Gateway>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // interval() fires immediately; consume that tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = gateway.dispatch(GatewayEvent::Sweep).await {
                tracing::warn!(error = %e, "eviction sweep failed");
            }
        }
    })
}
