//! Scripted network and config fixtures for gateway tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};

use arkalia_client::{FetchedResponse, Network, Request};
use arkalia_core::{Error, GatewayConfig};

struct Canned {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// A network with scripted routes; any unrouted URL fails with a transport
/// error, which doubles as the "offline" case.
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Canned>>,
    fetches: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), fetches: AtomicUsize::new(0) }
    }

    pub fn respond(&self, url: &str, status: u16, content_type: Option<&str>, body: Vec<u8>) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Canned { status, content_type: content_type.map(String::from), body },
        );
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let routes = self.routes.lock().unwrap();
        match routes.get(request.url.as_str()) {
            Some(canned) => Ok(FetchedResponse {
                final_url: request.url.clone(),
                status: StatusCode::from_u16(canned.status).unwrap(),
                content_type: canned.content_type.clone(),
                bytes: Bytes::from(canned.body.clone()),
                headers: header::HeaderMap::new(),
                fetch_ms: 1,
            }),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

/// Config pointed at the mock origin with a short precache manifest.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        origin: "http://127.0.0.1:8000".to_string(),
        cache_name: "arkalia-test".to_string(),
        precache_manifest: vec!["/".to_string(), "/index.html".to_string(), "/quick-start/".to_string()],
        ..Default::default()
    }
}
