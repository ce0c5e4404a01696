//! JSON-lines host protocol over stdio.
//!
//! The host sends one event per line on stdin; the gateway answers with one
//! reply per line on stdout. Logging goes to stderr so stdout stays clean
//! for the protocol. Malformed lines are answered with an ERROR reply and
//! never crash the loop.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

use arkalia_client::Request;

use crate::events::{EventOutcome, GatewayEvent};
use crate::gateway::{ControlMessage, Gateway};

/// Events the host may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WireEvent {
    #[serde(rename = "FETCH")]
    Fetch {
        /// Absolute URL, or a path resolved against the configured origin.
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        accept: Option<String>,
        #[serde(default)]
        navigate: bool,
    },
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    #[serde(rename = "GET_VERSION")]
    GetVersion,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Replies the gateway sends back.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum WireReply {
    #[serde(rename = "RESPONSE")]
    Response {
        status: u16,
        #[serde(rename = "contentType")]
        content_type: Option<String>,
        headers: Vec<(String, String)>,
        #[serde(rename = "bodyBase64")]
        body_base64: String,
        #[serde(rename = "servedFrom")]
        served_from: &'static str,
    },
    #[serde(rename = "VERSION")]
    Version {
        version: String,
        #[serde(rename = "cacheName")]
        cache_name: String,
    },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

/// Handle one parsed host event. SKIP_WAITING has no reply.
pub async fn handle_event(gateway: &Gateway, event: WireEvent) -> Option<WireReply> {
    match event {
        WireEvent::Fetch { url, method, accept, navigate } => Some(handle_fetch(gateway, url, method, accept, navigate).await),
        WireEvent::SkipWaiting => {
            if let Err(e) = gateway
                .dispatch(GatewayEvent::Message(ControlMessage::SkipWaiting))
                .await
            {
                tracing::warn!(error = %e, "skip-waiting failed");
            }
            None
        }
        WireEvent::GetVersion => {
            let (tx, rx) = oneshot::channel();
            let message = ControlMessage::GetVersion { reply: tx };
            if let Err(e) = gateway.dispatch(GatewayEvent::Message(message)).await {
                return Some(WireReply::Error { message: e.to_string() });
            }
            match rx.await {
                Ok(info) => Some(WireReply::Version { version: info.version, cache_name: info.cache_name }),
                Err(_) => Some(WireReply::Error { message: "version reply dropped".to_string() }),
            }
        }
    }
}

async fn handle_fetch(
    gateway: &Gateway, url: String, method: String, accept: Option<String>, navigate: bool,
) -> WireReply {
    let request = match build_request(gateway, &url, &method, accept, navigate) {
        Ok(r) => r,
        Err(message) => return WireReply::Error { message },
    };

    match gateway.dispatch(GatewayEvent::Fetch(request)).await {
        Ok(EventOutcome::Response(response)) => WireReply::Response {
            status: response.status,
            content_type: response.content_type,
            headers: response.headers,
            body_base64: BASE64.encode(&response.body),
            served_from: response.served_from.as_str(),
        },
        Ok(_) => WireReply::Error { message: "fetch produced no response".to_string() },
        Err(e) => WireReply::Error { message: e.to_string() },
    }
}

fn build_request(
    gateway: &Gateway, url: &str, method: &str, accept: Option<String>, navigate: bool,
) -> Result<Request, String> {
    let url = if url.starts_with('/') {
        url::Url::parse(&gateway.config().origin)
            .and_then(|origin| origin.join(url))
            .map_err(|e| format!("invalid path {url:?}: {e}"))?
    } else {
        url::Url::parse(url).map_err(|e| format!("invalid url {url:?}: {e}"))?
    };

    let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| format!("invalid method {method:?}: {e}"))?;

    Ok(Request { method, url, accept, navigate })
}

/// Run the stdio event loop until stdin closes.
pub async fn run(gateway: Arc<Gateway>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<WireEvent>(&line) {
            Ok(event) => handle_event(&gateway, event).await,
            Err(e) => {
                tracing::warn!(error = %e, "malformed host event");
                Some(WireReply::Error { message: format!("malformed event: {e}") })
            }
        };

        if let Some(reply) = reply {
            let mut json = serde_json::to_string(&reply)?;
            json.push('\n');
            stdout.write_all(json.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    tracing::info!("host closed stdin, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockNetwork, test_config};
    use arkalia_core::CacheDb;

    async fn active_gateway() -> (Gateway, Arc<MockNetwork>) {
        let mock = Arc::new(MockNetwork::new());
        let config = test_config();
        for path in &config.precache_manifest {
            mock.respond(
                &format!("http://127.0.0.1:8000{path}"),
                200,
                Some("text/html"),
                b"<html>precached</html>".to_vec(),
            );
        }

        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = Gateway::new(config, db, mock.clone());
        gateway.install().await.unwrap();
        gateway.activate().await.unwrap();
        (gateway, mock)
    }

    #[test]
    fn test_parse_fetch_event() {
        let event: WireEvent =
            serde_json::from_str(r#"{"type":"FETCH","url":"/assets/logo.svg"}"#).unwrap();
        match event {
            WireEvent::Fetch { url, method, accept, navigate } => {
                assert_eq!(url, "/assets/logo.svg");
                assert_eq!(method, "GET");
                assert!(accept.is_none());
                assert!(!navigate);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_parse_control_events() {
        assert!(matches!(
            serde_json::from_str::<WireEvent>(r#"{"type":"SKIP_WAITING"}"#).unwrap(),
            WireEvent::SkipWaiting
        ));
        assert!(matches!(
            serde_json::from_str::<WireEvent>(r#"{"type":"GET_VERSION"}"#).unwrap(),
            WireEvent::GetVersion
        ));
    }

    #[tokio::test]
    async fn test_get_version_reply_shape() {
        let (gateway, _mock) = active_gateway().await;

        let reply = handle_event(&gateway, WireEvent::GetVersion).await.unwrap();
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""type":"VERSION""#));
        assert!(json.contains(r#""cacheName":"arkalia-test""#));
        assert!(json.contains(r#""version":"3.0.1""#));
    }

    #[tokio::test]
    async fn test_skip_waiting_has_no_reply() {
        let (gateway, _mock) = active_gateway().await;
        let reply = handle_event(&gateway, WireEvent::SkipWaiting).await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_fetch_event_serves_precached_path() {
        let (gateway, _mock) = active_gateway().await;

        let event = WireEvent::Fetch {
            url: "/quick-start/".to_string(),
            method: "GET".to_string(),
            accept: Some("text/html".to_string()),
            navigate: true,
        };

        let reply = handle_event(&gateway, event).await.unwrap();
        match reply {
            WireReply::Response { status, served_from, body_base64, .. } => {
                assert_eq!(status, 200);
                // Navigation goes network-first and the mock is online.
                assert_eq!(served_from, "network");
                let body = BASE64.decode(body_base64).unwrap();
                assert_eq!(body, b"<html>precached</html>");
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_event_bad_url() {
        let (gateway, _mock) = active_gateway().await;

        let event = WireEvent::Fetch {
            url: "http://[not-a-url".to_string(),
            method: "GET".to_string(),
            accept: None,
            navigate: false,
        };

        let reply = handle_event(&gateway, event).await.unwrap();
        assert!(matches!(reply, WireReply::Error { .. }));
    }
}
