//! The gateway state machine and lifecycle operations.
//!
//! One `Gateway` instance is owned by the daemon's main loop; there is no
//! ambient global. Lifecycle follows the platform contract:
//!
//! ```text
//! New -> Installing -> Installed (waiting) -> Activating -> Active
//!            |
//!            v
//!        Redundant (failed install)
//! ```
//!
//! Install always completes (or fails) before activate begins, and activate
//! completes before the first request is served. A waiting gateway activates
//! when the host decides to, or immediately on a SKIP_WAITING message.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use arkalia_client::{Network, Request};
use arkalia_core::{CacheDb, Error, GatewayConfig};

use crate::strategy;
use crate::strategy::GatewayResponse;

/// Lifecycle state of the gateway instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    New,
    Installing,
    /// Installed and waiting to take over.
    Installed,
    Activating,
    Active,
    /// Install failed; this instance will never serve.
    Redundant,
}

/// Reply payload for a GET_VERSION control message.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub cache_name: String,
}

/// Out-of-band control messages from the host to the gateway.
#[derive(Debug)]
pub enum ControlMessage {
    /// Activate a waiting gateway immediately. No reply.
    SkipWaiting,
    /// Report the current version stamp and store name.
    GetVersion { reply: oneshot::Sender<VersionInfo> },
}

/// The offline cache gateway.
///
/// Mediates every intercepted request through the versioned cache store,
/// applying a per-category strategy, and manages store lifecycle.
pub struct Gateway {
    config: GatewayConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    state: Mutex<LifecycleState>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { config, db, network, state: Mutex::new(LifecycleState::New) }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(from = ?*state, to = ?next, "lifecycle transition");
        *state = next;
    }

    /// Provision the current store and precache the manifest.
    ///
    /// Every manifest path is fetched before anything is written, so a failed
    /// install leaves no partial store behind and the prior generation keeps
    /// serving. Any non-success response fails the whole install.
    ///
    /// Idempotent: re-installing an unchanged manifest and version rewrites
    /// the same entry set.
    pub async fn install(&self) -> Result<(), Error> {
        match self.state() {
            LifecycleState::Installing | LifecycleState::Activating => {
                return Err(Error::Lifecycle("install already in progress".into()));
            }
            _ => {}
        }
        self.set_state(LifecycleState::Installing);

        let origin = url::Url::parse(&self.config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut fetched = Vec::with_capacity(self.config.precache_manifest.len());
        for path in &self.config.precache_manifest {
            let url = origin
                .join(path)
                .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
            let request = Request::get(url);

            let response = match self.network.fetch(&request).await {
                Ok(r) if r.status.is_success() => r,
                Ok(r) => {
                    self.set_state(LifecycleState::Redundant);
                    return Err(Error::PrecacheFailed(format!("{path}: status {}", r.status.as_u16())));
                }
                Err(e) => {
                    self.set_state(LifecycleState::Redundant);
                    return Err(Error::PrecacheFailed(format!("{path}: {e}")));
                }
            };

            fetched.push((request, response));
        }

        self.db.create_store(&self.config.cache_name).await?;
        for (request, response) in &fetched {
            self.db
                .put_entry(&self.config.cache_name, &response.to_entry(request))
                .await?;
        }

        tracing::info!(
            store = %self.config.cache_name,
            entries = fetched.len(),
            "install complete, precached manifest"
        );
        self.set_state(LifecycleState::Installed);
        Ok(())
    }

    /// Take over: delete every stale store generation and begin serving.
    ///
    /// Deletion is best-effort; a store that fails to delete is logged and
    /// skipped so activation still completes.
    pub async fn activate(&self) -> Result<(), Error> {
        if self.state() != LifecycleState::Installed {
            return Err(Error::Lifecycle(format!("cannot activate from {:?}", self.state())));
        }
        self.set_state(LifecycleState::Activating);

        let names = self.db.list_stores().await?;
        for name in names {
            if name == self.config.cache_name {
                continue;
            }
            match self.db.delete_store(&name).await {
                Ok(_) => tracing::info!(store = %name, "deleted stale store"),
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to delete stale store, skipping"),
            }
        }

        self.set_state(LifecycleState::Active);
        tracing::info!(store = %self.config.cache_name, "gateway active");
        Ok(())
    }

    /// Mediate one intercepted request through the per-category strategy.
    ///
    /// Never returns an error for a request it absorbs: every failure inside
    /// cache-first and network-first resolves to a cached fallback or a
    /// synthesized response. The single propagating case is an uncached
    /// "other" request whose network fetch fails.
    pub async fn handle(&self, request: Request) -> Result<GatewayResponse, Error> {
        if self.state() != LifecycleState::Active {
            return Err(Error::Lifecycle(format!("gateway not active: {:?}", self.state())));
        }
        strategy::dispatch(&self.db, &self.network, &self.config.cache_name, request).await
    }

    /// Evict oldest entries when the current store exceeds its budget.
    ///
    /// May race in-flight cache writes; eviction only removes whole entries,
    /// so per-key consistency is unaffected.
    pub async fn cleanup(&self) -> Result<u64, Error> {
        let deleted = self
            .db
            .prune_oldest(&self.config.cache_name, self.config.max_entries, self.config.retain_entries)
            .await?;
        if deleted > 0 {
            tracing::info!(store = %self.config.cache_name, deleted, "cache cleanup completed");
        }
        Ok(deleted)
    }

    /// Handle an out-of-band control message.
    pub async fn on_message(&self, message: ControlMessage) -> Result<(), Error> {
        match message {
            ControlMessage::SkipWaiting => {
                if self.state() == LifecycleState::Installed {
                    tracing::info!("skip-waiting received, activating");
                    self.activate().await
                } else {
                    tracing::debug!(state = ?self.state(), "skip-waiting ignored");
                    Ok(())
                }
            }
            ControlMessage::GetVersion { reply } => {
                let info = VersionInfo {
                    version: self.config.version.clone(),
                    cache_name: self.config.cache_name.clone(),
                };
                // The host may have gone away; nothing to do if so.
                let _ = reply.send(info);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockNetwork, test_config};

    async fn gateway_with(mock: Arc<MockNetwork>) -> Gateway {
        let db = CacheDb::open_in_memory().await.unwrap();
        Gateway::new(test_config(), db, mock)
    }

    fn mock_with_manifest() -> Arc<MockNetwork> {
        let mock = MockNetwork::new();
        for path in test_config().precache_manifest {
            mock.respond(
                &format!("http://127.0.0.1:8000{path}"),
                200,
                Some("text/html"),
                b"<html>precached</html>".to_vec(),
            );
        }
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let mock = mock_with_manifest();
        let gateway = gateway_with(mock.clone()).await;

        gateway.install().await.unwrap();
        assert_eq!(gateway.state(), LifecycleState::Installed);

        let count = gateway.db.entry_count("arkalia-test").await.unwrap();
        assert_eq!(count, test_config().precache_manifest.len() as u64);
    }

    #[tokio::test]
    async fn test_install_twice_same_entry_set() {
        let mock = mock_with_manifest();
        let gateway = gateway_with(mock.clone()).await;

        gateway.install().await.unwrap();
        let first = gateway.db.list_entry_urls("arkalia-test").await.unwrap();

        gateway.install().await.unwrap();
        let second = gateway.db.list_entry_urls("arkalia-test").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_install_fails_on_missing_manifest_entry() {
        let mock = MockNetwork::new();
        // Only the root resolves; every other manifest path has no route.
        mock.respond("http://127.0.0.1:8000/", 200, Some("text/html"), b"<html/>".to_vec());
        let gateway = gateway_with(Arc::new(mock)).await;

        let result = gateway.install().await;
        assert!(matches!(result, Err(Error::PrecacheFailed(_))));
        assert_eq!(gateway.state(), LifecycleState::Redundant);

        // Fetch-all-then-write-all: nothing was written.
        let count = gateway.db.entry_count("arkalia-test").await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let mock = mock_with_manifest();
        mock.respond("http://127.0.0.1:8000/index.html", 500, None, Vec::new());
        let gateway = gateway_with(mock).await;

        let result = gateway.install().await;
        assert!(matches!(result, Err(Error::PrecacheFailed(_))));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_stores() {
        let mock = mock_with_manifest();
        let gateway = gateway_with(mock).await;

        // Stale generations left over from earlier versions.
        gateway.db.create_store("arkalia-v1").await.unwrap();
        gateway.db.create_store("arkalia-v2").await.unwrap();

        gateway.install().await.unwrap();
        gateway.activate().await.unwrap();

        assert_eq!(gateway.state(), LifecycleState::Active);
        let names = gateway.db.list_stores().await.unwrap();
        assert_eq!(names, vec!["arkalia-test"]);
    }

    #[tokio::test]
    async fn test_activate_keeps_only_current_generation() {
        let mut config = test_config();
        config.cache_name = "arkalia-v2".to_string();

        let mock = MockNetwork::new();
        for path in &config.precache_manifest {
            mock.respond(&format!("http://127.0.0.1:8000{path}"), 200, None, b"x".to_vec());
        }

        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_store("arkalia-v1").await.unwrap();
        db.create_store("arkalia-v2").await.unwrap();

        let gateway = Gateway::new(config, db, Arc::new(mock));
        gateway.install().await.unwrap();
        gateway.activate().await.unwrap();

        let names = gateway.db.list_stores().await.unwrap();
        assert_eq!(names, vec!["arkalia-v2"]);
    }

    #[tokio::test]
    async fn test_activate_requires_installed() {
        let gateway = gateway_with(Arc::new(MockNetwork::new())).await;
        let result = gateway.activate().await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_handle_requires_active() {
        let gateway = gateway_with(Arc::new(MockNetwork::new())).await;
        let request = Request::get(url::Url::parse("http://127.0.0.1:8000/a.css").unwrap());
        let result = gateway.handle(request).await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_waiting_gateway() {
        let mock = mock_with_manifest();
        let gateway = gateway_with(mock).await;
        gateway.install().await.unwrap();

        gateway.on_message(ControlMessage::SkipWaiting).await.unwrap();
        assert_eq!(gateway.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_skip_waiting_ignored_when_not_waiting() {
        let gateway = gateway_with(Arc::new(MockNetwork::new())).await;
        gateway.on_message(ControlMessage::SkipWaiting).await.unwrap();
        assert_eq!(gateway.state(), LifecycleState::New);
    }

    #[tokio::test]
    async fn test_get_version_replies() {
        let gateway = gateway_with(Arc::new(MockNetwork::new())).await;

        let (tx, rx) = oneshot::channel();
        gateway
            .on_message(ControlMessage::GetVersion { reply: tx })
            .await
            .unwrap();

        let info = rx.await.unwrap();
        assert_eq!(info.version, "3.0.1");
        assert_eq!(info.cache_name, "arkalia-test");
    }

    #[tokio::test]
    async fn test_cleanup_prunes_over_budget() {
        let mock = mock_with_manifest();
        let gateway = gateway_with(mock).await;
        gateway.install().await.unwrap();

        for i in 0..105 {
            let url = format!("http://127.0.0.1:8000/extra/{i}.json");
            let entry = arkalia_core::CacheEntry {
                key: arkalia_core::cache::key::compute_cache_key("GET", &url),
                method: "GET".to_string(),
                url,
                status: 200,
                content_type: Some("application/json".to_string()),
                headers_json: None,
                body: b"{}".to_vec(),
                inserted_at: chrono::Utc::now().to_rfc3339(),
            };
            gateway.db.put_entry("arkalia-test", &entry).await.unwrap();
        }

        let before = gateway.db.entry_count("arkalia-test").await.unwrap();
        assert!(before > 100);

        let deleted = gateway.cleanup().await.unwrap();
        assert_eq!(deleted, before - 80);
        assert_eq!(gateway.db.entry_count("arkalia-test").await.unwrap(), 80);
    }
}
