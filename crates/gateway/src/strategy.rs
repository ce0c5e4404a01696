//! Per-category caching strategies.
//!
//! - Cache First (static assets): cached copy wins; a miss goes to the
//!   network and successful responses are written back.
//! - Network First (navigations): network wins; transport failure falls back
//!   to the cached copy, then to the self-contained offline page.
//! - Stale-While-Revalidate (everything else): cached copy is returned
//!   immediately while a fire-and-forget refresh overwrites the entry.
//!
//! A non-success upstream response is returned to the caller as-is but is
//! never cached. A cache read failure degrades to a miss.

use std::sync::Arc;

use bytes::Bytes;

use arkalia_client::{Network, Request, RequestClass};
use arkalia_core::{CacheDb, CacheEntry, Error};

use crate::offline;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
    /// Synthesized by the gateway (offline page, 503 stub).
    Fallback,
}

impl ServedFrom {
    pub fn as_str(self) -> &'static str {
        match self {
            ServedFrom::Cache => "cache",
            ServedFrom::Network => "network",
            ServedFrom::Fallback => "fallback",
        }
    }
}

/// Response returned to the intercepted caller.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub served_from: ServedFrom,
}

impl GatewayResponse {
    fn from_entry(entry: CacheEntry) -> Self {
        let headers = entry
            .headers_json
            .as_deref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default();
        Self {
            status: entry.status,
            content_type: entry.content_type,
            headers,
            body: Bytes::from(entry.body),
            served_from: ServedFrom::Cache,
        }
    }

    fn from_network(response: &arkalia_client::FetchedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        Self {
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            headers,
            body: response.bytes.clone(),
            served_from: ServedFrom::Network,
        }
    }
}

/// Route a request to the strategy for its category.
pub async fn dispatch(
    db: &CacheDb, network: &Arc<dyn Network>, store: &str, request: Request,
) -> Result<GatewayResponse, Error> {
    let class = request.classify();
    tracing::debug!(url = %request.url, ?class, "handling request");
    match class {
        RequestClass::StaticAsset => Ok(cache_first(db, network, store, &request).await),
        RequestClass::Navigation => Ok(network_first(db, network, store, &request).await),
        RequestClass::Other => stale_while_revalidate(db, network, store, &request).await,
    }
}

/// Look up the cache, ignoring read failures (they degrade to a miss).
async fn lookup(db: &CacheDb, store: &str, request: &Request) -> Option<CacheEntry> {
    match db.get_entry(store, &request.cache_key()).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache read failed, treating as miss");
            None
        }
    }
}

/// Write a successful response back to the store; never fails the request.
async fn write_back(db: &CacheDb, store: &str, request: &Request, response: &arkalia_client::FetchedResponse) {
    if !response.status.is_success() {
        return;
    }
    if let Err(e) = db.put_entry(store, &response.to_entry(request)).await {
        tracing::warn!(url = %request.url, error = %e, "cache write failed");
    }
}

async fn cache_first(db: &CacheDb, network: &Arc<dyn Network>, store: &str, request: &Request) -> GatewayResponse {
    if let Some(entry) = lookup(db, store, request).await {
        return GatewayResponse::from_entry(entry);
    }

    match network.fetch(request).await {
        Ok(response) => {
            write_back(db, store, request, &response).await;
            GatewayResponse::from_network(&response)
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache-first miss and fetch failed");
            offline::asset_unavailable()
        }
    }
}

async fn network_first(db: &CacheDb, network: &Arc<dyn Network>, store: &str, request: &Request) -> GatewayResponse {
    match network.fetch(request).await {
        Ok(response) => {
            write_back(db, store, request, &response).await;
            GatewayResponse::from_network(&response)
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "network failed, trying cache");
            match lookup(db, store, request).await {
                Some(entry) => GatewayResponse::from_entry(entry),
                None => offline::offline_page(),
            }
        }
    }
}

async fn stale_while_revalidate(
    db: &CacheDb, network: &Arc<dyn Network>, store: &str, request: &Request,
) -> Result<GatewayResponse, Error> {
    if let Some(entry) = lookup(db, store, request).await {
        revalidate_in_background(db.clone(), Arc::clone(network), store.to_string(), request.clone());
        return Ok(GatewayResponse::from_entry(entry));
    }

    // Uncached: the caller gets the network result directly, and a transport
    // failure here is the one case that propagates.
    let response = network.fetch(request).await?;
    write_back(db, store, request, &response).await;
    Ok(GatewayResponse::from_network(&response))
}

/// Fire-and-forget refresh; its outcome is observed only in logs.
fn revalidate_in_background(db: CacheDb, network: Arc<dyn Network>, store: String, request: Request) {
    tokio::spawn(async move {
        match network.fetch(&request).await {
            Ok(response) => write_back(&db, &store, &request, &response).await,
            Err(e) => tracing::debug!(url = %request.url, error = %e, "background revalidation failed"),
        }
    });
}
